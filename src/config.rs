//! Engine configuration
//!
//! Everything here is optional; a missing section falls back to the defaults
//! below. The TOML shape is:
//!
//! ```toml
//! [about]
//! product = "StatusLine"
//!
//! [commands]
//! timeout_ms = 10000
//!
//! [http]
//! timeout_ms = 10000
//! system_proxy = true
//!
//! [network]
//! address_prefix = "192"
//!
//! [environment]
//! machine_files = ["/etc/environment"]
//!
//! [refresh]
//! background = false
//! min_interval_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub about: AboutConfig,
    pub commands: CommandConfig,
    pub http: HttpConfig,
    pub network: NetworkConfig,
    pub environment: EnvironmentConfig,
    pub refresh: RefreshConfig,
}

/// Content of the rotating `{About}` line
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AboutConfig {
    pub product: String,
    pub author: String,
    pub license: String,
    /// Replaces the generated list entirely when set
    pub lines: Option<Vec<String>>,
}

impl Default for AboutConfig {
    fn default() -> Self {
        Self {
            product: "StatusLine".to_string(),
            author: "github.com/derDere".to_string(),
            license: "GNU GENERAL PUBLIC LICENSE V3".to_string(),
            lines: None,
        }
    }
}

impl AboutConfig {
    /// The lines `{About}` cycles through, in display order
    pub fn lines(&self) -> Vec<String> {
        if let Some(lines) = &self.lines {
            return lines.clone();
        }
        vec![
            format!("About {}", self.product),
            format!("Developed by: {}", self.author),
            format!("License: {}", self.license),
            format!("Version: {}", env!("CARGO_PKG_VERSION")),
            "Language: Rust".to_string(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CommandConfig {
    pub timeout_ms: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Honour `HTTP_PROXY` and friends
    pub system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: concat!("statusline-engine/", env!("CARGO_PKG_VERSION")).to_string(),
            system_proxy: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Only addresses whose dotted form starts with this are reported by `{IP}`
    pub address_prefix: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address_prefix: "192".to_string(),
        }
    }
}

/// Files backing the user and machine environment scopes
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Empty means `$XDG_CONFIG_HOME/environment.d/*.conf`
    pub user_files: Vec<PathBuf>,
    pub machine_files: Vec<PathBuf>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            user_files: Vec::new(),
            machine_files: vec![PathBuf::from("/etc/environment")],
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
    /// Resolve `$(run:)` and `$(url:)` off the calling thread
    pub background: bool,
    pub min_interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            background: false,
            min_interval_ms: 1_000,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.commands.timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http.timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.min_interval_ms)
    }

    /// Set the product name shown by `{About}`
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.about.product = product.into();
        self
    }

    /// Replace the `{About}` rotation
    pub fn with_about_lines(mut self, lines: Vec<String>) -> Self {
        self.about.lines = Some(lines);
        self
    }

    /// Set the bound on one `$(run:)` resolution
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.commands.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the bound on one `$(url:)` resolution
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Enable or disable proxies taken from the environment
    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.http.system_proxy = enabled;
        self
    }

    /// Set the prefix filtering `{IP}` addresses
    pub fn with_address_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.network.address_prefix = prefix.into();
        self
    }

    /// Set the files forming the user environment scope
    pub fn with_user_env_files(mut self, files: Vec<PathBuf>) -> Self {
        self.environment.user_files = files;
        self
    }

    /// Set the files forming the machine environment scope
    pub fn with_machine_env_files(mut self, files: Vec<PathBuf>) -> Self {
        self.environment.machine_files = files;
        self
    }

    /// Enable or disable background resolution of slow generators
    pub fn with_background_refresh(mut self, background: bool) -> Self {
        self.refresh.background = background;
        self
    }

    /// Set the minimum time between two refreshes of one slow token
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh.min_interval_ms = interval.as_millis() as u64;
        self
    }
}
