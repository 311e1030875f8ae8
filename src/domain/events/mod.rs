use crate::domain::value_objects::{DashboardId, Topic, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Where a data point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointSource {
    /// Synthetic periodic generation.
    Generated,
    /// Collaboration broadcast on the reserved topic.
    Collaboration,
    /// Published by an external producer.
    External,
}

/// One message fanned out to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: Uuid,
    pub topic: Topic,
    /// Producing user; `system` for generated data.
    pub user_id: UserId,
    /// Dashboard scope; when set, delivery is restricted to matching clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<DashboardId>,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    /// Payload was replaced by a cache reference.
    pub compressed: bool,
    /// Payload carries only fields changed since the previous delivery.
    pub delta: bool,
    pub source: PointSource,
}

impl DataPoint {
    /// A synthetic point produced by a topic generator.
    pub fn generated(topic: Topic, payload: Value) -> Self {
        DataPoint {
            id: Uuid::new_v4(),
            topic,
            user_id: UserId::system(),
            dashboard_id: None,
            payload,
            timestamp: Utc::now(),
            compressed: false,
            delta: false,
            source: PointSource::Generated,
        }
    }

    /// A point published by an external producer on behalf of a user.
    pub fn external(topic: Topic, user_id: UserId, payload: Value) -> Self {
        DataPoint {
            id: Uuid::new_v4(),
            topic,
            user_id,
            dashboard_id: None,
            payload,
            timestamp: Utc::now(),
            compressed: false,
            delta: false,
            source: PointSource::External,
        }
    }

    pub fn with_dashboard(mut self, dashboard_id: DashboardId) -> Self {
        self.dashboard_id = Some(dashboard_id);
        self
    }
}

/// A user-attributed action on a shared dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationAction {
    Join,
    Leave,
    Cursor,
    Edit,
    Comment,
}

/// Broadcast to every other client sharing the dashboard, independent of
/// topic subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationEvent {
    pub dashboard_id: DashboardId,
    pub user_id: UserId,
    pub action: CollaborationAction,
    pub detail: Value,
    pub timestamp: DateTime<Utc>,
}

impl CollaborationEvent {
    pub fn new(
        dashboard_id: DashboardId,
        user_id: UserId,
        action: CollaborationAction,
        detail: Value,
    ) -> Self {
        CollaborationEvent {
            dashboard_id,
            user_id,
            action,
            detail,
            timestamp: Utc::now(),
        }
    }

    /// Wrap as a `user-action` data point. Collaboration traffic is always
    /// sent in full: compression and delta stay disabled.
    pub fn into_data_point(self) -> DataPoint {
        let detail = serde_json::json!({
            "action": self.action,
            "detail": self.detail,
        });
        DataPoint {
            id: Uuid::new_v4(),
            topic: Topic::user_action(),
            user_id: self.user_id,
            dashboard_id: Some(self.dashboard_id),
            payload: detail,
            timestamp: self.timestamp,
            compressed: false,
            delta: false,
            source: PointSource::Collaboration,
        }
    }
}

/// Aggregate counters reported on the metrics interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMetrics {
    pub registered_clients: usize,
    pub active_topics: usize,
    /// Deliveries during the last reporting window; resets every window.
    pub delivered_last_window: u64,
    /// reference-size / original-size of the most recent compressed payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    pub evicted_total: u64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_point_is_system_owned() {
        let point = DataPoint::generated(
            Topic::new("seo-metrics").unwrap(),
            json!({"organic_traffic": 1200}),
        );
        assert!(point.user_id.is_system());
        assert_eq!(point.source, PointSource::Generated);
        assert!(!point.compressed);
        assert!(!point.delta);
    }

    #[test]
    fn test_collaboration_wraps_as_user_action() {
        let event = CollaborationEvent::new(
            DashboardId::from("dash-1"),
            UserId::from("u1"),
            CollaborationAction::Cursor,
            json!({"x": 10, "y": 20}),
        );
        let point = event.into_data_point();
        assert!(point.topic.is_user_action());
        assert_eq!(point.dashboard_id, Some(DashboardId::from("dash-1")));
        assert_eq!(point.source, PointSource::Collaboration);
        assert!(!point.compressed);
        assert!(!point.delta);
        assert_eq!(point.payload["action"], json!("cursor"));
    }
}
