//! Parameterized generators: environment lookup, command output, URL content

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;

use crate::config::EngineConfig;
use crate::context::ResolutionContext;
use crate::error::ResolveError;

const EXIT_POLL: Duration = Duration::from_millis(5);

/// Collapse output to a single line
pub fn strip_line_breaks(text: &str) -> String {
    text.replace(['\r', '\n'], "")
}

/// Value of `name` in the first scope defining it, or `token` untouched
pub fn env_lookup(ctx: &dyn ResolutionContext, token: &str, name: &str) -> String {
    match ctx.lookup_env(name) {
        Some(value) => value,
        None => {
            tracing::trace!(name, "environment variable not set");
            token.to_string()
        }
    }
}

/// Find `name` in the search path of every scope; fall back to the bare name
pub fn find_executable(ctx: &dyn ResolutionContext, name: &str) -> PathBuf {
    let bare = Path::new(name);
    if bare.components().count() > 1 {
        return bare.to_path_buf();
    }
    ctx.search_path()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| bare.to_path_buf())
}

/// A `$(run:...)` argument split into program and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split on whitespace and resolve the program through the search path
    pub fn parse(ctx: &dyn ResolutionContext, argument: &str) -> Result<Self, ResolveError> {
        let mut parts = argument.split_whitespace();
        let name = parts.next().ok_or(ResolveError::EmptyCommand)?;
        Ok(Self {
            program: find_executable(ctx, name),
            args: parts.map(str::to_string).collect(),
        })
    }

    fn display(&self) -> String {
        let mut shown = self.program.display().to_string();
        for arg in &self.args {
            shown.push(' ');
            shown.push_str(arg);
        }
        shown
    }

    /// Run to completion and return stdout on one line
    ///
    /// The exit status is ignored. A child still running after `timeout` is killed.
    pub fn run(&self, timeout: Duration) -> Result<String, ResolveError> {
        let deadline = Instant::now() + timeout;
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        hide_window(&mut command);

        let mut child = command.spawn().map_err(|source| ResolveError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let Some(mut stdout) = child.stdout.take() else {
            kill(&mut child);
            return Err(ResolveError::Unavailable("child stdout"));
        };
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let result = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(result);
        });

        let remaining = deadline.saturating_duration_since(Instant::now());
        let output = match rx.recv_timeout(remaining) {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => {
                kill(&mut child);
                return Err(ResolveError::Read(err));
            }
            Err(_) => {
                kill(&mut child);
                return Err(ResolveError::timeout(self.display(), timeout));
            }
        };

        // stdout is closed; give the process until the deadline to exit
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::trace!(command = %self.display(), %status, "command finished");
                    break;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                Ok(None) => {
                    kill(&mut child);
                    return Err(ResolveError::timeout(self.display(), timeout));
                }
                Err(err) => {
                    kill(&mut child);
                    return Err(ResolveError::Read(err));
                }
            }
        }

        Ok(strip_line_breaks(&String::from_utf8_lossy(&output)))
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(windows)]
fn hide_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(_command: &mut Command) {}

/// Build the client used for `$(url:...)`
pub fn http_client(config: &EngineConfig) -> Result<Client, ResolveError> {
    let mut builder = Client::builder()
        .timeout(config.http_timeout())
        .user_agent(config.http.user_agent.as_str());
    if !config.http.system_proxy {
        builder = builder.no_proxy();
    }
    Ok(builder.build()?)
}

/// Resolve `$(url:...)`: GET the body, on one line
///
/// Non-success statuses are errors.
pub fn fetch_url(client: &Client, url: &str) -> Result<String, ResolveError> {
    let body = client.get(url).send()?.error_for_status()?.text()?;
    Ok(strip_line_breaks(&body))
}
