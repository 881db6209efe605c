//! Error types for resolution and configuration

use std::io;
use std::time::Duration;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Marker wrapped around the message of a failed command or URL resolution
pub const ERROR_MARKER: &str = "!!!";

/// Errors a single resolver can run into
///
/// These never leave the engine: `Engine::apply_to` turns them into the
/// generator's fallback text.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// `$(run:)` with nothing to run
    #[error("no command given")]
    EmptyCommand,

    /// The executable could not be started
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading the child's output failed
    #[error("failed to read output: {0}")]
    Read(#[source] io::Error),

    /// The command or request did not finish in time
    #[error("{what} timed out after {}ms", .timeout.as_millis())]
    Timeout { what: String, timeout: Duration },

    /// HTTP transport or status failure
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// An OS facility is not available on this machine
    #[error("{0} is not available")]
    Unavailable(&'static str),
}

impl ResolveError {
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout,
        }
    }

    /// Render the error the way it is shown inline in a status line
    pub fn to_marked(&self) -> String {
        let message = self.to_string().replace(['\r', '\n'], "");
        format!("{ERROR_MARKER}{message}{ERROR_MARKER}")
    }
}

/// Errors that can occur when loading an engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

impl ConfigError {
    /// Format the error with source context using ariadne
    ///
    /// I/O errors have no source position and fall back to their display form.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let ConfigError::ParseError(err) = self else {
            return self.to_string();
        };

        let span = err.span().unwrap_or(0..0);
        let message = err.message().to_string();
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message("invalid configuration")
            .with_label(
                Label::new((filename, span))
                    .with_message(&message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
