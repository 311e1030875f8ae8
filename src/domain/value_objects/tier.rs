use crate::domain::errors::StreamError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Subscription plan level gating resource quotas.
///
/// The set is closed; anything else is rejected at the parse boundary
/// with `StreamError::InvalidTier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Starter,
    Agency,
    Enterprise,
    Admin,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Free,
        Tier::Starter,
        Tier::Agency,
        Tier::Enterprise,
        Tier::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Starter => "starter",
            Tier::Agency => "agency",
            Tier::Enterprise => "enterprise",
            Tier::Admin => "admin",
        }
    }

    /// Payload compression is available to every paid tier.
    pub fn compression_enabled(&self) -> bool {
        !matches!(self, Tier::Free)
    }

    /// Delta encoding is reserved for the higher tiers.
    pub fn delta_enabled(&self) -> bool {
        matches!(self, Tier::Agency | Tier::Enterprise | Tier::Admin)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "starter" => Ok(Tier::Starter),
            "agency" => Ok(Tier::Agency),
            "enterprise" => Ok(Tier::Enterprise),
            "admin" => Ok(Tier::Admin),
            other => Err(StreamError::InvalidTier(other.to_string())),
        }
    }
}

/// Resource limits resolved for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Concurrent connections allowed per user.
    pub max_connections_per_user: u32,
    /// Topic subscriptions allowed per client.
    pub max_subscriptions: u32,
    /// Deliveries per second per topic for one client.
    pub max_updates_per_sec: u32,
}

impl TierLimits {
    pub const fn new(
        max_connections_per_user: u32,
        max_subscriptions: u32,
        max_updates_per_sec: u32,
    ) -> Self {
        TierLimits {
            max_connections_per_user,
            max_subscriptions,
            max_updates_per_sec,
        }
    }

    /// Minimum spacing between two deliveries of the same topic to one
    /// client. A zero rate is clamped to one update per second.
    pub fn min_delivery_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.max_updates_per_sec.max(1) as u64)
    }
}

/// The per-tier quota table.
///
/// Static configuration: it can be overridden from the config file at
/// startup but is never mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaTable {
    #[serde(default = "default_free")]
    pub free: TierLimits,
    #[serde(default = "default_starter")]
    pub starter: TierLimits,
    #[serde(default = "default_agency")]
    pub agency: TierLimits,
    #[serde(default = "default_enterprise")]
    pub enterprise: TierLimits,
    #[serde(default = "default_admin")]
    pub admin: TierLimits,
}

fn default_free() -> TierLimits {
    TierLimits::new(1, 3, 1)
}
fn default_starter() -> TierLimits {
    TierLimits::new(2, 5, 2)
}
fn default_agency() -> TierLimits {
    TierLimits::new(5, 10, 5)
}
fn default_enterprise() -> TierLimits {
    TierLimits::new(20, 50, 10)
}
fn default_admin() -> TierLimits {
    TierLimits::new(100, 200, 20)
}

impl Default for QuotaTable {
    fn default() -> Self {
        QuotaTable {
            free: default_free(),
            starter: default_starter(),
            agency: default_agency(),
            enterprise: default_enterprise(),
            admin: default_admin(),
        }
    }
}

impl QuotaTable {
    pub fn limits(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Free => self.free,
            Tier::Starter => self.starter,
            Tier::Agency => self.agency,
            Tier::Enterprise => self.enterprise,
            Tier::Admin => self.admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tier() {
        assert_eq!("free".parse::<Tier>().unwrap(), Tier::Free);
        assert_eq!("Enterprise".parse::<Tier>().unwrap(), Tier::Enterprise);
        assert!(matches!(
            "platinum".parse::<Tier>(),
            Err(StreamError::InvalidTier(_))
        ));
    }

    #[test]
    fn test_default_quota_table() {
        let table = QuotaTable::default();
        assert_eq!(table.limits(Tier::Free), TierLimits::new(1, 3, 1));
        assert_eq!(table.limits(Tier::Starter), TierLimits::new(2, 5, 2));
        assert_eq!(table.limits(Tier::Agency), TierLimits::new(5, 10, 5));
        assert_eq!(table.limits(Tier::Enterprise), TierLimits::new(20, 50, 10));
        assert_eq!(table.limits(Tier::Admin), TierLimits::new(100, 200, 20));
    }

    #[test]
    fn test_capabilities_by_tier() {
        assert!(!Tier::Free.compression_enabled());
        assert!(Tier::Starter.compression_enabled());
        assert!(!Tier::Starter.delta_enabled());
        assert!(Tier::Agency.delta_enabled());
        assert!(Tier::Admin.delta_enabled());
    }

    #[test]
    fn test_min_delivery_interval() {
        assert_eq!(
            TierLimits::new(1, 3, 1).min_delivery_interval(),
            Duration::from_millis(1000)
        );
        assert_eq!(
            TierLimits::new(100, 200, 20).min_delivery_interval(),
            Duration::from_millis(50)
        );
        // Degenerate rate does not divide by zero
        assert_eq!(
            TierLimits::new(1, 1, 0).min_delivery_interval(),
            Duration::from_millis(1000)
        );
    }
}
