//! Placeholder registry: which token maps to which generator
//!
//! Registration order is part of the contract. The engine applies the
//! entries in this order, so text produced by an early entry is still
//! visible to the entries after it.

use std::fmt;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Errors that can occur while building a registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two entries would match the same text
    #[error("duplicate placeholder: {token}")]
    Duplicate { token: String },

    /// The pattern could not be compiled
    #[error("invalid placeholder pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Every generator the engine knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generator {
    CalendarWeek,
    Weekday,
    LocalTime,
    UtcTime,
    SwatchTime,
    Date,
    UserName,
    HostName,
    IpAddress,
    Battery,
    About,
    Rainbow,
    Guid,
    RandomNumber,
    EnvVar,
    RunCommand,
    FetchUrl,
}

impl Generator {
    /// Short stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Generator::CalendarWeek => "calendar-week",
            Generator::Weekday => "weekday",
            Generator::LocalTime => "local-time",
            Generator::UtcTime => "utc-time",
            Generator::SwatchTime => "swatch-time",
            Generator::Date => "date",
            Generator::UserName => "user-name",
            Generator::HostName => "host-name",
            Generator::IpAddress => "ip-address",
            Generator::Battery => "battery",
            Generator::About => "about",
            Generator::Rainbow => "rainbow",
            Generator::Guid => "guid",
            Generator::RandomNumber => "random-number",
            Generator::EnvVar => "env",
            Generator::RunCommand => "run",
            Generator::FetchUrl => "url",
        }
    }

    /// Text substituted when a fixed-key generator fails
    pub fn fallback(&self) -> &'static str {
        match self {
            Generator::Battery => "0",
            _ => "",
        }
    }

    /// Whether failures are shown inline as `!!!message!!!` instead of
    /// [`fallback`](Self::fallback)
    pub fn reports_errors(&self) -> bool {
        matches!(self, Generator::RunCommand | Generator::FetchUrl)
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an entry matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// A literal `{KEY}` token
    Fixed { key: String },
    /// `$(namespace:argument)` with free-form argument
    Parameterized { namespace: String, example: String },
}

impl Pattern {
    pub fn fixed(key: impl Into<String>) -> Self {
        Pattern::Fixed { key: key.into() }
    }

    /// `example` is the argument placeholder shown in documentation
    pub fn parameterized(namespace: impl Into<String>, example: impl Into<String>) -> Self {
        Pattern::Parameterized {
            namespace: namespace.into(),
            example: example.into(),
        }
    }

    /// Literal form shown in documentation, e.g. `{T}` or `$(env:VAR)`
    pub fn display_token(&self) -> String {
        match self {
            Pattern::Fixed { key } => format!("{{{key}}}"),
            Pattern::Parameterized { namespace, example } => format!("$({namespace}:{example})"),
        }
    }

    /// Case-insensitive matcher; `.` spans line breaks
    ///
    /// Parameterized matchers capture the argument in group 3, which ends at
    /// the first `)`.
    pub fn compile(&self) -> Result<Regex, RegistryError> {
        let source = match self {
            Pattern::Fixed { .. } => regex::escape(&self.display_token()),
            Pattern::Parameterized { namespace, .. } => {
                format!(r"(\$\()({}:)(.*?)(\))", regex::escape(namespace))
            }
        };
        Ok(RegexBuilder::new(&source)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?)
    }

    /// Identity used for duplicate detection
    fn identity(&self) -> String {
        match self {
            Pattern::Fixed { key } => format!("{{{}}}", key.to_lowercase()),
            Pattern::Parameterized { namespace, .. } => format!("$({}:", namespace.to_lowercase()),
        }
    }
}

/// One registered placeholder
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub pattern: Pattern,
    pub generator: Generator,
    pub description: String,
    matcher: Regex,
}

impl RegistryEntry {
    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }
}

/// Ordered list of placeholders
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    entries: Vec<RegistryEntry>,
}

impl TokenRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn register(
        &mut self,
        pattern: Pattern,
        description: impl Into<String>,
        generator: Generator,
    ) -> Result<(), RegistryError> {
        let identity = pattern.identity();
        if self.entries.iter().any(|e| e.pattern.identity() == identity) {
            return Err(RegistryError::Duplicate {
                token: pattern.display_token(),
            });
        }

        let matcher = pattern.compile()?;
        self.entries.push(RegistryEntry {
            pattern,
            generator,
            description: description.into(),
            matcher,
        });
        Ok(())
    }

    /// The built-in placeholder set
    pub fn standard() -> Self {
        Self::build_standard().expect("standard placeholders are distinct and valid")
    }

    fn build_standard() -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        let fixed = [
            ("CW", "Calendar week", Generator::CalendarWeek),
            ("W", "Weekday", Generator::Weekday),
            ("T", "Local time", Generator::LocalTime),
            ("U", "UTC time", Generator::UtcTime),
            ("S", "Swatch time", Generator::SwatchTime),
            ("D", "Date", Generator::Date),
            ("User", "Username", Generator::UserName),
            ("Host", "Machine name", Generator::HostName),
            ("IP", "IP address", Generator::IpAddress),
            ("Battery", "Battery level in %", Generator::Battery),
            ("About", "About infos", Generator::About),
            ("Rainbow", "Rainbow", Generator::Rainbow),
            ("Guid", "GUID", Generator::Guid),
            ("Rnd", "Random number", Generator::RandomNumber),
        ];
        for (key, description, generator) in fixed {
            registry.register(Pattern::fixed(key), description, generator)?;
        }

        registry.register(
            Pattern::parameterized("env", "VAR"),
            "Content of environment variable VAR",
            Generator::EnvVar,
        )?;
        registry.register(
            Pattern::parameterized("run", "APP"),
            "Run APP and display its output",
            Generator::RunCommand,
        )?;
        registry.register(
            Pattern::parameterized("url", "URL"),
            "Get content from URL",
            Generator::FetchUrl,
        )?;

        Ok(registry)
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(literal token, description)` pairs in registration order
    pub fn documentation(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.pattern.display_token(), e.description.clone()))
            .collect()
    }

    /// Help block for generated configuration files
    ///
    /// One line per entry: `<comment> - <token> -> <description>`, tokens
    /// padded to a common width.
    pub fn reference_block(&self, comment: &str) -> String {
        let docs = self.documentation();
        let width = docs.iter().map(|(token, _)| token.len()).max().unwrap_or(0);
        docs.iter()
            .map(|(token, description)| format!("{comment} - {token:<width$} -> {description}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_order() {
        let registry = TokenRegistry::standard();
        let tokens: Vec<String> = registry.documentation().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                "{CW}", "{W}", "{T}", "{U}", "{S}", "{D}", "{User}", "{Host}", "{IP}",
                "{Battery}", "{About}", "{Rainbow}", "{Guid}", "{Rnd}", "$(env:VAR)",
                "$(run:APP)", "$(url:URL)",
            ]
        );
    }

    #[test]
    fn test_fixed_before_parameterized() {
        let registry = TokenRegistry::standard();
        let first_param = registry
            .entries()
            .iter()
            .position(|e| matches!(e.pattern, Pattern::Parameterized { .. }))
            .unwrap();
        assert!(registry.entries()[first_param..]
            .iter()
            .all(|e| matches!(e.pattern, Pattern::Parameterized { .. })));
    }

    #[test]
    fn test_duplicate_rejected_case_insensitively() {
        let mut registry = TokenRegistry::new();
        registry
            .register(Pattern::fixed("T"), "Local time", Generator::LocalTime)
            .expect("First register should succeed");
        let result = registry.register(Pattern::fixed("t"), "again", Generator::UtcTime);
        assert!(matches!(result, Err(RegistryError::Duplicate { .. })));

        registry
            .register(Pattern::parameterized("env", "VAR"), "env", Generator::EnvVar)
            .unwrap();
        let result = registry.register(Pattern::parameterized("ENV", "NAME"), "env", Generator::EnvVar);
        assert!(matches!(result, Err(RegistryError::Duplicate { .. })));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_fixed_matcher_is_literal_and_case_insensitive() {
        let re = Pattern::fixed("T").compile().unwrap();
        assert!(re.is_match("{T}"));
        assert!(re.is_match("{t}"));
        assert!(!re.is_match("T"));
        assert!(!re.is_match("{Tx}"));
    }

    #[test]
    fn test_parameterized_matcher() {
        let re = Pattern::parameterized("run", "APP").compile().unwrap();
        let caps = re.captures("x $(RUN:git\nstatus) y").unwrap();
        assert_eq!(&caps[0], "$(RUN:git\nstatus)");
        assert_eq!(&caps[3], "git\nstatus");

        let all: Vec<&str> = re
            .find_iter("$(run:a) $(run:b)")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(all, vec!["$(run:a)", "$(run:b)"]);
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(Generator::Battery.fallback(), "0");
        assert_eq!(Generator::UserName.fallback(), "");
        assert!(Generator::RunCommand.reports_errors());
        assert!(Generator::FetchUrl.reports_errors());
        assert!(!Generator::EnvVar.reports_errors());
        assert!(!Generator::Battery.reports_errors());
    }

    #[test]
    fn test_reference_block() {
        let registry = TokenRegistry::standard();
        insta::assert_snapshot!(registry.reference_block("//"), @r###"
        // - {CW}       -> Calendar week
        // - {W}        -> Weekday
        // - {T}        -> Local time
        // - {U}        -> UTC time
        // - {S}        -> Swatch time
        // - {D}        -> Date
        // - {User}     -> Username
        // - {Host}     -> Machine name
        // - {IP}       -> IP address
        // - {Battery}  -> Battery level in %
        // - {About}    -> About infos
        // - {Rainbow}  -> Rainbow
        // - {Guid}     -> GUID
        // - {Rnd}      -> Random number
        // - $(env:VAR) -> Content of environment variable VAR
        // - $(run:APP) -> Run APP and display its output
        // - $(url:URL) -> Get content from URL
        "###);
    }
}
