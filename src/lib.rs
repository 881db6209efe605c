//! StatusLine engine - dynamic content for status bars and launcher tiles
//!
//! Template lines carry placeholder tokens that are resolved to live values
//! on every refresh: `{T}` for the local time, `$(env:HOME)` for an
//! environment variable, `$(run:uptime -p)` for command output and so on.
//!
//! # Example
//!
//! ```rust
//! use statusline_engine::{Engine, EngineConfig, EnvScope, FixedContext};
//!
//! let ctx = FixedContext::new()
//!     .at_local(3600, (2024, 6, 15), (13, 45, 30))
//!     .with_user_name("ada")
//!     .with_env(EnvScope::User, "EDITOR", "hx");
//! let engine = Engine::with_context(EngineConfig::default(), ctx);
//!
//! assert_eq!(engine.apply_to("{User} {T} $(env:EDITOR)"), "ada 13:45:30 hx");
//! assert_eq!(engine.apply_to("$(env:NOPE)"), "$(env:NOPE)");
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod generators;
pub mod refresh;
pub mod registry;

pub use config::EngineConfig;
pub use context::{EnvScope, FixedContext, ResolutionContext, SystemContext};
pub use engine::Engine;
pub use error::{ConfigError, ResolveError, ERROR_MARKER};
pub use registry::{Generator, Pattern, RegistryError, TokenRegistry};

/// Resolve one line against the live system with default configuration
///
/// Builds a fresh engine per call; keep an [`Engine`] around when rendering
/// repeatedly.
///
/// ```rust
/// let line = statusline_engine::render("no placeholders here");
/// assert_eq!(line, "no placeholders here");
/// ```
pub fn render(line: &str) -> String {
    Engine::default().apply_to(line)
}
