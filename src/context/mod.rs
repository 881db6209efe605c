//! Ambient state read by the resolvers
//!
//! Resolvers never touch the OS directly. They go through a
//! [`ResolutionContext`], so an engine can run against the live machine
//! ([`SystemContext`]) or against frozen values ([`FixedContext`]).

mod env_file;
mod fixed;
mod system;

use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};

pub use env_file::{parse_env_file, read_env_files};
pub use fixed::FixedContext;
pub use system::SystemContext;

/// Level at which an environment variable can be defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvScope {
    /// The running process
    Process,
    /// The logged-in user
    User,
    /// The whole machine
    Machine,
}

impl EnvScope {
    /// Lookup precedence: the first scope defining a variable wins
    pub const SEARCH_ORDER: [EnvScope; 3] = [EnvScope::Process, EnvScope::User, EnvScope::Machine];
}

impl fmt::Display for EnvScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvScope::Process => "process",
            EnvScope::User => "user",
            EnvScope::Machine => "machine",
        };
        f.write_str(name)
    }
}

/// Read-only view of the clock, environment and machine identity
pub trait ResolutionContext: Send + Sync {
    /// Current local wall-clock time, carrying the local UTC offset
    fn now(&self) -> DateTime<FixedOffset>;

    /// Value of `name` at exactly one scope
    fn env_var(&self, scope: EnvScope, name: &str) -> Option<String>;

    fn user_name(&self) -> Option<String>;

    fn host_name(&self) -> Option<String>;

    fn ipv4_addresses(&self) -> Vec<Ipv4Addr>;

    /// Charge level in `0.0..=1.0`, `None` without a battery
    fn battery_fraction(&self) -> Option<f64>;

    /// First definition of `name` following [`EnvScope::SEARCH_ORDER`]
    fn lookup_env(&self, name: &str) -> Option<String> {
        EnvScope::SEARCH_ORDER
            .iter()
            .find_map(|scope| self.env_var(*scope, name))
    }

    /// Executable search directories, process scope first
    fn search_path(&self) -> Vec<PathBuf> {
        EnvScope::SEARCH_ORDER
            .iter()
            .filter_map(|scope| self.env_var(*scope, "PATH"))
            .flat_map(|value| std::env::split_paths(&value).collect::<Vec<_>>())
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_order() {
        assert_eq!(
            EnvScope::SEARCH_ORDER,
            [EnvScope::Process, EnvScope::User, EnvScope::Machine]
        );
    }

    #[test]
    fn test_lookup_prefers_process_scope() {
        let ctx = FixedContext::new()
            .with_env(EnvScope::Machine, "SHADOWED", "machine")
            .with_env(EnvScope::User, "SHADOWED", "user")
            .with_env(EnvScope::Process, "SHADOWED", "process");
        assert_eq!(ctx.lookup_env("SHADOWED").as_deref(), Some("process"));
    }

    #[test]
    fn test_lookup_falls_through_to_machine() {
        let ctx = FixedContext::new().with_env(EnvScope::Machine, "ONLY_MACHINE", "m");
        assert_eq!(ctx.lookup_env("ONLY_MACHINE").as_deref(), Some("m"));
        assert_eq!(ctx.lookup_env("MISSING"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_concatenates_scopes() {
        let ctx = FixedContext::new()
            .with_env(EnvScope::Process, "PATH", "/p1:/p2")
            .with_env(EnvScope::User, "PATH", "/u1")
            .with_env(EnvScope::Machine, "PATH", "/m1::");
        assert_eq!(
            ctx.search_path(),
            vec![
                PathBuf::from("/p1"),
                PathBuf::from("/p2"),
                PathBuf::from("/u1"),
                PathBuf::from("/m1"),
            ]
        );
    }
}
