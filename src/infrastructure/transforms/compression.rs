use crate::application::ports::{PayloadTransform, TransformOutcome};
use crate::domain::{ClientId, DataPoint, Topic, UserId};
use serde_json::{Value, json};
use std::collections::HashMap;
use uuid::Uuid;

/// Cache-reference compression.
///
/// Tracks the last payload sent to each client for a (topic, producing
/// user) pair. When the next payload is structurally identical, the
/// delivery carries `{"cache_ref": <id>}` instead of the full payload and
/// the compressed flag is set. Any other payload re-caches and passes
/// through in full.
#[derive(Default)]
pub struct CompressionCache {
    entries: HashMap<(ClientId, Topic, UserId), CachedPayload>,
}

struct CachedPayload {
    id: Uuid,
    payload: Value,
}

impl CompressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn serialized_len(value: &Value) -> usize {
        serde_json::to_string(value).map_or(0, |s| s.len())
    }
}

impl PayloadTransform for CompressionCache {
    fn apply(&mut self, client: &ClientId, point: &mut DataPoint) -> TransformOutcome {
        let key = (client.clone(), point.topic.clone(), point.user_id.clone());

        if let Some(cached) = self.entries.get(&key)
            && cached.payload == point.payload
        {
            let original_len = Self::serialized_len(&point.payload);
            point.payload = json!({ "cache_ref": cached.id });
            point.compressed = true;
            return TransformOutcome::CacheHit {
                reference_len: Self::serialized_len(&point.payload),
                original_len,
            };
        }

        self.entries.insert(
            key,
            CachedPayload {
                id: Uuid::new_v4(),
                payload: point.payload.clone(),
            },
        );
        TransformOutcome::Full
    }

    fn forget_client(&mut self, client: &ClientId) {
        self.entries.retain(|(id, _, _), _| id != client);
    }
}
