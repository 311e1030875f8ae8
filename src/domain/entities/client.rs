use crate::domain::value_objects::{ClientId, DashboardId, Tier, TierLimits, Topic, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Transport a registration arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    WebSocket,
    Sse,
}

/// Tier-derived delivery preferences, fixed for the life of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPrefs {
    pub compression: bool,
    pub delta: bool,
    pub max_updates_per_sec: u32,
}

impl DeliveryPrefs {
    pub fn for_tier(tier: Tier, limits: TierLimits) -> Self {
        DeliveryPrefs {
            compression: tier.compression_enabled(),
            delta: tier.delta_enabled(),
            max_updates_per_sec: limits.max_updates_per_sec,
        }
    }

    /// Minimum spacing between two deliveries of one topic to this client.
    pub fn min_delivery_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.max_updates_per_sec.max(1) as u64)
    }
}

/// One registered consumer of the stream.
///
/// The registration is either present or gone; there is no paused state.
/// Liveness is the instant of the last successful delivery or heartbeat.
#[derive(Debug)]
pub struct ClientRegistration {
    pub id: ClientId,
    pub user_id: UserId,
    pub dashboard_id: Option<DashboardId>,
    pub tier: Tier,
    pub connection: ConnectionKind,
    pub prefs: DeliveryPrefs,
    subscriptions: HashSet<Topic>,
    last_seen: Instant,
}

impl ClientRegistration {
    pub fn new(
        id: ClientId,
        user_id: UserId,
        tier: Tier,
        limits: TierLimits,
        connection: ConnectionKind,
        dashboard_id: Option<DashboardId>,
    ) -> Self {
        ClientRegistration {
            id,
            user_id,
            dashboard_id,
            tier,
            connection,
            prefs: DeliveryPrefs::for_tier(tier, limits),
            subscriptions: HashSet::new(),
            last_seen: Instant::now(),
        }
    }

    pub fn subscriptions(&self) -> &HashSet<Topic> {
        &self.subscriptions
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.subscriptions.contains(topic)
    }

    /// Returns true if the topic was newly added.
    pub fn add_subscription(&mut self, topic: Topic) -> bool {
        self.subscriptions.insert(topic)
    }

    /// Returns true if the topic was present.
    pub fn remove_subscription(&mut self, topic: &Topic) -> bool {
        self.subscriptions.remove(topic)
    }

    /// Refresh liveness after a successful delivery or heartbeat.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.last_seen.elapsed() > threshold
    }

    /// Dashboard scope check: an unscoped data point matches everyone.
    pub fn matches_dashboard(&self, scope: Option<&DashboardId>) -> bool {
        match scope {
            None => true,
            Some(d) => self.dashboard_id.as_ref() == Some(d),
        }
    }

    pub fn descriptor(&self) -> ClientDescriptor {
        ClientDescriptor {
            client_id: self.id.clone(),
            user_id: self.user_id.clone(),
            dashboard_id: self.dashboard_id.clone(),
            tier: self.tier,
            connection: self.connection,
            prefs: self.prefs,
        }
    }
}

/// Snapshot of a registration handed back to the registering caller.
#[derive(Debug, Clone, Serialize)]
pub struct ClientDescriptor {
    pub client_id: ClientId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<DashboardId>,
    pub tier: Tier,
    pub connection: ConnectionKind,
    pub prefs: DeliveryPrefs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::QuotaTable;

    fn registration(tier: Tier) -> ClientRegistration {
        let limits = QuotaTable::default().limits(tier);
        ClientRegistration::new(
            ClientId::from("c1"),
            UserId::from("u1"),
            tier,
            limits,
            ConnectionKind::WebSocket,
            None,
        )
    }

    #[test]
    fn test_prefs_follow_tier() {
        let free = registration(Tier::Free);
        assert!(!free.prefs.compression);
        assert!(!free.prefs.delta);
        assert_eq!(free.prefs.max_updates_per_sec, 1);

        let agency = registration(Tier::Agency);
        assert!(agency.prefs.compression);
        assert!(agency.prefs.delta);
        assert_eq!(
            agency.prefs.min_delivery_interval(),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_subscription_set_dedups() {
        let mut reg = registration(Tier::Free);
        let topic = Topic::new("seo-metrics").unwrap();
        assert!(reg.add_subscription(topic.clone()));
        assert!(!reg.add_subscription(topic.clone()));
        assert_eq!(reg.subscription_count(), 1);
        assert!(reg.remove_subscription(&topic));
        assert!(!reg.remove_subscription(&topic));
    }

    #[test]
    fn test_dashboard_scope() {
        let mut reg = registration(Tier::Starter);
        let dash = DashboardId::from("dash-1");
        assert!(reg.matches_dashboard(None));
        assert!(!reg.matches_dashboard(Some(&dash)));
        reg.dashboard_id = Some(dash.clone());
        assert!(reg.matches_dashboard(Some(&dash)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness() {
        let mut reg = registration(Tier::Free);
        let threshold = Duration::from_secs(30);
        assert!(!reg.is_stale(threshold));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(reg.is_stale(threshold));

        reg.touch();
        assert!(!reg.is_stale(threshold));
    }
}
