//! StatusLine CLI
//!
//! Usage:
//!   statusline [OPTIONS] [TEMPLATE]...
//!
//! Options:
//!   -f, --file <FILE>      Template file, one line per column
//!   -c, --config <FILE>    Engine configuration (TOML format)
//!   -r, --reference        Show the placeholder reference
//!   -w, --watch            Re-render on every tick
//!   -v, --verbose          Log resolution details to stderr
//!   -h, --help             Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use statusline_engine::{ConfigError, Engine, EngineConfig};

/// Lines starting with this are ignored in template files
const COMMENT: &str = "//";

#[derive(Parser)]
#[command(name = "statusline")]
#[command(about = "Resolve dynamic placeholders in status line templates")]
struct Cli {
    /// Template lines (read from --file or stdin if not provided)
    templates: Vec<String>,

    /// Template file, one line per column
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show the placeholder reference
    #[arg(short, long)]
    reference: bool,

    /// Re-render on every tick instead of once
    #[arg(short, long)]
    watch: bool,

    /// Milliseconds between two ticks in watch mode
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Stop watching after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Log resolution details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(message) => {
                eprintln!("{}", message);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let engine = Engine::new(config);

    if cli.reference {
        println!("{}", engine.reference_block(COMMENT));
        return;
    }

    // No templates anywhere and an interactive stdin: show a short intro
    if cli.templates.is_empty() && cli.file.is_none() && io::stdin().is_terminal() {
        print_intro(&engine);
        return;
    }

    let templates = match read_templates(&cli) {
        Ok(templates) => templates,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    };

    if !cli.watch {
        render_once(&engine, &templates);
        return;
    }

    let interval = Duration::from_millis(cli.interval_ms);
    let mut tick = 0u64;
    loop {
        render_once(&engine, &templates);
        tick += 1;
        if cli.ticks.is_some_and(|limit| tick >= limit) {
            break;
        }
        thread::sleep(interval);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<EngineConfig, String> {
    let content = fs::read_to_string(path).map_err(|e| {
        format!(
            "Error loading config '{}': {}",
            path.display(),
            ConfigError::from(e)
        )
    })?;
    EngineConfig::from_str(&content).map_err(|e| e.format(&content, &path.display().to_string()))
}

fn read_templates(cli: &Cli) -> Result<Vec<String>, String> {
    if !cli.templates.is_empty() {
        return Ok(cli.templates.clone());
    }

    let source = match &cli.file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Error reading file '{}': {}", path.display(), e))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Error reading from stdin: {}", e))?;
            buffer
        }
    };

    Ok(template_lines(&source))
}

/// Non-empty, non-comment lines of a template file
fn template_lines(source: &str) -> Vec<String> {
    source
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with(COMMENT)
        })
        .map(str::to_string)
        .collect()
}

fn render_once(engine: &Engine, templates: &[String]) {
    for line in engine.apply_all(templates) {
        println!("{}", line);
    }
}

fn print_intro(engine: &Engine) {
    println!(
        r#"StatusLine - dynamic placeholders for status bars

USAGE:
    statusline [OPTIONS] [TEMPLATE]...
    echo '{{User}}@{{Host}} {{T}}' | statusline

OPTIONS:
    -f, --file         Template file, one line per column ({COMMENT} comments)
    -c, --config       Engine configuration (TOML file)
    -r, --reference    Show the placeholder reference
    -w, --watch        Re-render every --interval-ms (default 1000)
    -v, --verbose      Log resolution details to stderr
    -h, --help         Print help

PLACEHOLDERS:
{}"#,
        engine.reference_block("   ")
    );
}
