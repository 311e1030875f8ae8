use crate::domain::{ClientId, Topic};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Per client+topic delivery pacing.
///
/// Admits at most one delivery per interval for a given (client, topic)
/// pair; the caller drops rejected deliveries outright. There is no queue
/// here at all: last-value-wins, never backpressure.
#[derive(Default)]
pub struct DeliveryGate {
    last_delivery: HashMap<(ClientId, Topic), Instant>,
}

impl DeliveryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a delivery may go out now; records the admission instant.
    pub fn try_pass(&mut self, client: &ClientId, topic: &Topic, min_interval: Duration) -> bool {
        let now = Instant::now();
        let key = (client.clone(), topic.clone());

        if let Some(last) = self.last_delivery.get(&key)
            && now.duration_since(*last) < min_interval
        {
            return false;
        }

        self.last_delivery.insert(key, now);
        true
    }

    pub fn forget_client(&mut self, client: &ClientId) {
        self.last_delivery.retain(|(id, _), _| id != client);
    }
}
