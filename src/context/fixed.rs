//! Frozen context for tests and embedders with their own ambient state

use std::collections::HashMap;
use std::net::Ipv4Addr;

use chrono::{DateTime, FixedOffset, TimeZone};

use super::{EnvScope, ResolutionContext};

/// Context whose every value is set up front
///
/// The clock never advances; two resolutions against the same
/// `FixedContext` see the same instant.
#[derive(Debug, Clone)]
pub struct FixedContext {
    now: DateTime<FixedOffset>,
    env: HashMap<(EnvScope, String), String>,
    user_name: Option<String>,
    host_name: Option<String>,
    addresses: Vec<Ipv4Addr>,
    battery: Option<f64>,
}

impl Default for FixedContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedContext {
    /// Empty environment at 2024-01-01T00:00:00Z
    pub fn new() -> Self {
        let utc = FixedOffset::east_opt(0).expect("zero offset is valid");
        Self {
            now: utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .expect("valid date"),
            env: HashMap::new(),
            user_name: None,
            host_name: None,
            addresses: Vec::new(),
            battery: None,
        }
    }

    /// Freeze the clock at `now`
    pub fn at(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = now;
        self
    }

    /// Freeze the clock at a local date-time with the given UTC offset in seconds
    ///
    /// Returns the context unchanged if the date-time does not exist.
    pub fn at_local(
        self,
        offset_secs: i32,
        (year, month, day): (i32, u32, u32),
        (hour, minute, second): (u32, u32, u32),
    ) -> Self {
        let instant = FixedOffset::east_opt(offset_secs)
            .and_then(|tz| tz.with_ymd_and_hms(year, month, day, hour, minute, second).single());
        match instant {
            Some(now) => self.at(now),
            None => self,
        }
    }

    pub fn with_env(mut self, scope: EnvScope, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert((scope, name.into()), value.into());
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_host_name(mut self, name: impl Into<String>) -> Self {
        self.host_name = Some(name.into());
        self
    }

    pub fn with_addresses(mut self, addresses: Vec<Ipv4Addr>) -> Self {
        self.addresses = addresses;
        self
    }

    pub fn with_battery(mut self, fraction: f64) -> Self {
        self.battery = Some(fraction);
        self
    }
}

impl ResolutionContext for FixedContext {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    fn env_var(&self, scope: EnvScope, name: &str) -> Option<String> {
        self.env.get(&(scope, name.to_string())).cloned()
    }

    fn user_name(&self) -> Option<String> {
        self.user_name.clone()
    }

    fn host_name(&self) -> Option<String> {
        self.host_name.clone()
    }

    fn ipv4_addresses(&self) -> Vec<Ipv4Addr> {
        self.addresses.clone()
    }

    fn battery_fraction(&self) -> Option<f64> {
        self.battery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_at_local() {
        let ctx = FixedContext::new().at_local(3600, (2024, 6, 15), (13, 45, 30));
        let now = ctx.now();
        assert_eq!(now.hour(), 13);
        assert_eq!(now.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_at_local_invalid_keeps_clock() {
        let ctx = FixedContext::new().at_local(0, (2024, 2, 30), (0, 0, 0));
        assert_eq!(ctx.now(), FixedContext::new().now());
    }

    #[test]
    fn test_env_is_scoped() {
        let ctx = FixedContext::new().with_env(EnvScope::User, "HOME_DIR", "/home/u");
        assert_eq!(ctx.env_var(EnvScope::User, "HOME_DIR").as_deref(), Some("/home/u"));
        assert_eq!(ctx.env_var(EnvScope::Process, "HOME_DIR"), None);
    }
}
