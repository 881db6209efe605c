//! `KEY=VALUE` environment files (`/etc/environment`, `environment.d`)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Parse one environment file
///
/// Blank lines and `#` comments are skipped, an optional `export ` prefix is
/// accepted and one level of matching quotes is removed from values.
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Read and merge files in order; later files override earlier ones
///
/// Unreadable files are skipped.
pub fn read_env_files(files: &[PathBuf]) -> HashMap<String, String> {
    let mut merged = HashMap::new();
    for file in files {
        match std::fs::read_to_string(file) {
            Ok(content) => merged.extend(parse_env_file(&content)),
            Err(err) => {
                tracing::trace!(path = %file.display(), error = %err, "skipping environment file");
            }
        }
    }
    merged
}

/// `*.conf` files of an `environment.d` directory in lexical order
pub(crate) fn environment_d_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "conf"))
        .collect();
    files.sort();
    files
}
