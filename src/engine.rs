//! Substitution engine: rewrites a template line into display text

use std::sync::Arc;

use regex::Captures;
use reqwest::blocking::Client;

use crate::config::EngineConfig;
use crate::context::{ResolutionContext, SystemContext};
use crate::error::ResolveError;
use crate::generators::command::{self, CommandLine};
use crate::generators::{clock, identity, random};
use crate::refresh::BackgroundResolver;
use crate::registry::{Generator, RegistryEntry, TokenRegistry};

/// Resolves placeholders in template lines
///
/// The registry is fixed at construction. `apply_to` takes `&self` and keeps
/// no state between calls, so one engine can serve several threads.
pub struct Engine {
    registry: TokenRegistry,
    config: EngineConfig,
    about_lines: Vec<String>,
    context: Arc<dyn ResolutionContext>,
    http: Option<Client>,
    background: Option<BackgroundResolver>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("entries", &self.registry.len())
            .field("config", &self.config)
            .field("background", &self.background.is_some())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Engine over the live system
    pub fn new(config: EngineConfig) -> Self {
        let context = SystemContext::new(&config.environment);
        Self::with_context(config, context)
    }

    /// Engine over an explicit context, with the standard placeholders
    pub fn with_context(config: EngineConfig, context: impl ResolutionContext + 'static) -> Self {
        Self::with_registry(config, context, TokenRegistry::standard())
    }

    /// Engine over an explicit context and registry
    pub fn with_registry(
        config: EngineConfig,
        context: impl ResolutionContext + 'static,
        registry: TokenRegistry,
    ) -> Self {
        let http = match command::http_client(&config) {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "HTTP client unavailable, $(url:) will report errors");
                None
            }
        };
        let background = config
            .refresh
            .background
            .then(|| BackgroundResolver::new(config.refresh_interval()));

        tracing::debug!(
            entries = registry.len(),
            background = background.is_some(),
            "engine ready"
        );

        Self {
            about_lines: config.about.lines(),
            registry,
            config,
            context: Arc::new(context),
            http,
            background,
        }
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `(literal token, description)` pairs in registration order
    pub fn documentation(&self) -> Vec<(String, String)> {
        self.registry.documentation()
    }

    /// See [`TokenRegistry::reference_block`]
    pub fn reference_block(&self, comment: &str) -> String {
        self.registry.reference_block(comment)
    }

    /// Replace every placeholder in `line`
    ///
    /// Entries run one after another in registration order. Each match is
    /// resolved on its own; the output of an entry is not rescanned by that
    /// entry or earlier ones, but later entries do see it.
    pub fn apply_to(&self, line: &str) -> String {
        let mut current = line.to_string();
        for entry in self.registry.entries() {
            if !entry.matcher().is_match(&current) {
                continue;
            }
            current = entry
                .matcher()
                .replace_all(&current, |caps: &Captures<'_>| self.resolve(entry, caps))
                .into_owned();
        }
        current
    }

    /// [`apply_to`](Self::apply_to) for each line
    pub fn apply_all<I, S>(&self, lines: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .map(|line| self.apply_to(line.as_ref()))
            .collect()
    }

    fn resolve(&self, entry: &RegistryEntry, caps: &Captures<'_>) -> String {
        let generator = entry.generator;
        let token = caps.get(0).map_or("", |m| m.as_str());
        let argument = caps.get(3).map_or("", |m| m.as_str());

        match self.generate(generator, token, argument) {
            Ok(value) => {
                tracing::trace!(%generator, token, "resolved");
                value
            }
            Err(err) => {
                tracing::warn!(%generator, token, error = %err, "placeholder fell back");
                if generator.reports_errors() {
                    err.to_marked()
                } else {
                    generator.fallback().to_string()
                }
            }
        }
    }

    fn generate(
        &self,
        generator: Generator,
        token: &str,
        argument: &str,
    ) -> Result<String, ResolveError> {
        let ctx = self.context.as_ref();
        let now = ctx.now();

        let value = match generator {
            Generator::CalendarWeek => clock::calendar_week(&now),
            Generator::Weekday => clock::weekday(&now),
            Generator::LocalTime => clock::local_time(&now),
            Generator::UtcTime => clock::utc_time(&now),
            Generator::SwatchTime => clock::swatch_time(&now),
            Generator::Date => clock::date(&now),
            Generator::UserName => identity::user_name(ctx)?,
            Generator::HostName => identity::host_name(ctx)?,
            Generator::IpAddress => identity::ip_addresses(ctx, &self.config.network.address_prefix),
            Generator::Battery => identity::battery_percent(ctx)?,
            Generator::About => clock::about(&now, &self.about_lines),
            Generator::Rainbow => clock::rainbow(&now),
            Generator::Guid => random::guid(),
            Generator::RandomNumber => random::number(),
            Generator::EnvVar => command::env_lookup(ctx, token, argument),
            Generator::RunCommand => self.run_command(token, argument)?,
            Generator::FetchUrl => self.fetch_url(token, argument)?,
        };
        Ok(value)
    }

    fn run_command(&self, token: &str, argument: &str) -> Result<String, ResolveError> {
        let line = CommandLine::parse(self.context.as_ref(), argument)?;
        let timeout = self.config.command_timeout();

        match &self.background {
            Some(background) => Ok(background.lookup(token, move || {
                line.run(timeout).unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "background command failed");
                    err.to_marked()
                })
            })),
            None => line.run(timeout),
        }
    }

    fn fetch_url(&self, token: &str, url: &str) -> Result<String, ResolveError> {
        let client = self
            .http
            .clone()
            .ok_or(ResolveError::Unavailable("HTTP client"))?;

        match &self.background {
            Some(background) => {
                let url = url.to_string();
                Ok(background.lookup(token, move || {
                    command::fetch_url(&client, &url).unwrap_or_else(|err| {
                        tracing::warn!(error = %err, "background fetch failed");
                        err.to_marked()
                    })
                }))
            }
            None => command::fetch_url(&client, url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EnvScope, FixedContext};
    use crate::registry::Pattern;
    use pretty_assertions::assert_eq;

    fn engine(ctx: FixedContext) -> Engine {
        Engine::with_context(EngineConfig::default(), ctx)
    }

    fn fixed() -> FixedContext {
        FixedContext::new()
            .at_local(3600, (2024, 6, 15), (13, 45, 30))
            .with_user_name("ada")
            .with_host_name("analytical")
            .with_battery(0.5)
    }

    #[test]
    fn test_plain_line_unchanged() {
        let e = engine(fixed());
        for line in ["", "hello", "{nope} $(nope:x) {T", "$(env:unterminated"] {
            assert_eq!(e.apply_to(line), line);
        }
    }

    #[test]
    fn test_fixed_tokens() {
        let e = engine(fixed());
        assert_eq!(
            e.apply_to("{D} {T} {U} {W} KW-{CW} {S}"),
            "2024-06-15 13:45:30 12:45:30 Sa KW-24 573.26"
        );
        assert_eq!(e.apply_to("{User}@{Host} {Battery}%"), "ada@analytical 50%");
    }

    #[test]
    fn test_fixed_tokens_case_insensitive() {
        let e = engine(fixed());
        assert_eq!(e.apply_to("{user}/{USER}"), "ada/ada");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let e = engine(fixed());
        assert_eq!(e.apply_to("{T}|{T}|{T}"), "13:45:30|13:45:30|13:45:30");
    }

    #[test]
    fn test_each_random_occurrence_independent() {
        let e = engine(fixed());
        let out = e.apply_to("{Guid} {Guid}");
        let parts: Vec<&str> = out.split(' ').collect();
        assert_eq!(parts.len(), 2);
        assert_ne!(parts[0], parts[1]);
    }

    #[test]
    fn test_missing_identity_falls_back() {
        let e = engine(FixedContext::new());
        assert_eq!(e.apply_to("[{User}] [{Battery}] [{IP}]"), "[] [0] []");
    }

    #[test]
    fn test_env_token() {
        let ctx = fixed().with_env(EnvScope::User, "SHELL_NAME", "fish");
        let e = engine(ctx);
        assert_eq!(e.apply_to("sh=$(env:SHELL_NAME)"), "sh=fish");
        assert_eq!(e.apply_to("$(ENV:NOPE_XYZ)"), "$(ENV:NOPE_XYZ)");
    }

    #[test]
    fn test_output_visible_to_later_entries_only() {
        // {T} runs before env, so a variable expanding to "{T}" stays literal
        let ctx = fixed().with_env(EnvScope::Process, "LATE", "{T}");
        let e = engine(ctx);
        assert_eq!(e.apply_to("$(env:LATE)"), "{T}");

        // a fixed token producing an env token is expanded by the later env entry
        let ctx = fixed()
            .with_user_name("$(env:WHO)")
            .with_env(EnvScope::Process, "WHO", "grace");
        let e = engine(ctx);
        assert_eq!(e.apply_to("{User}"), "grace");
    }

    #[test]
    fn test_empty_run_reports_error() {
        let e = engine(fixed());
        assert_eq!(e.apply_to("<$(run: )>"), "<!!!no command given!!!>");
    }

    #[test]
    fn test_about_follows_config() {
        let config = EngineConfig::default().with_about_lines(vec!["one".into(), "two".into()]);
        // 13:45:30 -> 49530 s, 49530 % 4 = 2 -> second entry
        let e = Engine::with_context(config, fixed());
        assert_eq!(e.apply_to("{About}"), "two");
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = TokenRegistry::new();
        registry
            .register(Pattern::fixed("Now"), "Local time", Generator::LocalTime)
            .unwrap();
        let e = Engine::with_registry(EngineConfig::default(), fixed(), registry);
        assert_eq!(e.apply_to("{Now} {T}"), "13:45:30 {T}");
        assert_eq!(e.documentation().len(), 1);
    }

    #[test]
    fn test_apply_all() {
        let e = engine(fixed());
        assert_eq!(e.apply_all(["{D}", "plain"]), vec!["2024-06-15", "plain"]);
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
