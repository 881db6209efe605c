//! Machine identity and hardware generators

use crate::context::ResolutionContext;
use crate::error::ResolveError;

pub fn user_name(ctx: &dyn ResolutionContext) -> Result<String, ResolveError> {
    ctx.user_name().ok_or(ResolveError::Unavailable("user name"))
}

pub fn host_name(ctx: &dyn ResolutionContext) -> Result<String, ResolveError> {
    ctx.host_name().ok_or(ResolveError::Unavailable("host name"))
}

/// Local IPv4 addresses starting with `prefix`, comma separated
pub fn ip_addresses(ctx: &dyn ResolutionContext, prefix: &str) -> String {
    ctx.ipv4_addresses()
        .iter()
        .map(|ip| ip.to_string())
        .filter(|ip| ip.starts_with(prefix))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Battery charge in whole percent
pub fn battery_percent(ctx: &dyn ResolutionContext) -> Result<String, ResolveError> {
    let fraction = ctx
        .battery_fraction()
        .filter(|f| f.is_finite())
        .ok_or(ResolveError::Unavailable("battery"))?;
    let percent = (fraction * 100.0).round().clamp(0.0, 100.0) as u8;
    Ok(percent.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FixedContext;
    use std::net::Ipv4Addr;

    #[test]
    fn test_ip_prefix_filter() {
        let ctx = FixedContext::new().with_addresses(vec![
            Ipv4Addr::new(192, 168, 1, 20),
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(192, 168, 56, 1),
        ]);
        assert_eq!(ip_addresses(&ctx, "192"), "192.168.1.20, 192.168.56.1");
        assert_eq!(ip_addresses(&ctx, "172"), "");
    }

    #[test]
    fn test_battery_rounding() {
        let ctx = FixedContext::new().with_battery(0.456);
        assert_eq!(battery_percent(&ctx).unwrap(), "46");
        let full = FixedContext::new().with_battery(1.2);
        assert_eq!(battery_percent(&full).unwrap(), "100");
    }

    #[test]
    fn test_battery_missing() {
        let ctx = FixedContext::new();
        assert!(matches!(
            battery_percent(&ctx),
            Err(ResolveError::Unavailable("battery"))
        ));
    }

    #[test]
    fn test_identity() {
        let ctx = FixedContext::new().with_user_name("ada").with_host_name("engine");
        assert_eq!(user_name(&ctx).unwrap(), "ada");
        assert_eq!(host_name(&ctx).unwrap(), "engine");
        assert!(user_name(&FixedContext::new()).is_err());
    }
}
