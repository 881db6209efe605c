//! Live operating system context

use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};

use super::env_file::{environment_d_files, read_env_files};
use super::{EnvScope, ResolutionContext};
use crate::config::EnvironmentConfig;

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Context backed by the running machine
///
/// The user and machine scopes are plain `KEY=VALUE` files and are re-read on
/// every lookup.
#[derive(Debug, Clone)]
pub struct SystemContext {
    user_files: Vec<PathBuf>,
    machine_files: Vec<PathBuf>,
    power_supply_dir: PathBuf,
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new(&EnvironmentConfig::default())
    }
}

impl SystemContext {
    pub fn new(config: &EnvironmentConfig) -> Self {
        let user_files = if config.user_files.is_empty() {
            default_user_env_dir()
                .map(|dir| environment_d_files(&dir))
                .unwrap_or_default()
        } else {
            config.user_files.clone()
        };

        Self {
            user_files,
            machine_files: config.machine_files.clone(),
            power_supply_dir: PathBuf::from(POWER_SUPPLY_DIR),
        }
    }

    /// Read batteries from another sysfs-style directory
    pub fn with_power_supply_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.power_supply_dir = dir.into();
        self
    }
}

fn default_user_env_dir() -> Option<PathBuf> {
    let config_home = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(config_home.join("environment.d"))
}

impl ResolutionContext for SystemContext {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn env_var(&self, scope: EnvScope, name: &str) -> Option<String> {
        match scope {
            EnvScope::Process => env::var(name).ok(),
            EnvScope::User => read_env_files(&self.user_files).remove(name),
            EnvScope::Machine => read_env_files(&self.machine_files).remove(name),
        }
    }

    fn user_name(&self) -> Option<String> {
        ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .find_map(|key| env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn host_name(&self) -> Option<String> {
        if let Some(name) = ["HOSTNAME", "COMPUTERNAME"]
            .iter()
            .find_map(|key| env::var(key).ok().filter(|v| !v.is_empty()))
        {
            return Some(name);
        }
        ["/proc/sys/kernel/hostname", "/etc/hostname"]
            .iter()
            .find_map(|path| {
                fs::read_to_string(path)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
    }

    fn ipv4_addresses(&self) -> Vec<Ipv4Addr> {
        let found = interface_addresses();
        if !found.is_empty() {
            return found;
        }
        match self.host_name() {
            Some(host) => host_addresses(&host),
            None => Vec::new(),
        }
    }

    fn battery_fraction(&self) -> Option<f64> {
        read_battery_capacity(&self.power_supply_dir).map(|percent| percent / 100.0)
    }
}

/// IPv4 addresses of the non-loopback interfaces, in interface order
fn interface_addresses() -> Vec<Ipv4Addr> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(err) => {
            tracing::debug!(error = %err, "listing interfaces failed");
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    for iface in interfaces.iter().filter(|iface| !iface.is_loopback()) {
        if let IpAddr::V4(v4) = iface.ip() {
            push_unique(&mut found, v4);
        }
    }
    found
}

/// Addresses the host name resolves to
fn host_addresses(host: &str) -> Vec<Ipv4Addr> {
    let addrs = match (host, 0).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(err) => {
            tracing::debug!(host = %host, error = %err, "host lookup failed");
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    for addr in addrs {
        if let IpAddr::V4(v4) = addr.ip() {
            push_unique(&mut found, v4);
        }
    }
    found
}

fn push_unique(found: &mut Vec<Ipv4Addr>, addr: Ipv4Addr) {
    if !found.contains(&addr) {
        found.push(addr);
    }
}

/// Capacity in percent of the first supply whose `type` is `Battery`
fn read_battery_capacity(dir: &Path) -> Option<f64> {
    let mut supplies: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    supplies.sort();

    supplies.iter().find_map(|supply| {
        let kind = fs::read_to_string(supply.join("type")).ok()?;
        if kind.trim() != "Battery" {
            return None;
        }
        fs::read_to_string(supply.join("capacity"))
            .ok()?
            .trim()
            .parse::<f64>()
            .ok()
    })
}
