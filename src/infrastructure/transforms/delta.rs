use crate::application::ports::{PayloadTransform, TransformOutcome};
use crate::domain::{ClientId, DataPoint, Topic};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Shallow field-level delta encoding.
///
/// Keeps the last full payload sent to each client per topic. Subsequent
/// object payloads are rewritten to only the top-level fields that changed;
/// removed fields appear as `null`. The first delivery, non-object
/// payloads, and cache-reference payloads pass through in full. The full
/// payload is always re-cached, so deltas chain against the latest state.
#[derive(Default)]
pub struct DeltaEncoder {
    last_full: HashMap<(ClientId, Topic), Value>,
}

impl DeltaEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level diff: changed or new fields keep their new value, removed
    /// fields are marked with `null`.
    fn shallow_diff(prev: &Map<String, Value>, current: &Map<String, Value>) -> Map<String, Value> {
        let mut diff = Map::new();

        for (field, value) in current {
            match prev.get(field) {
                Some(old) if old == value => {}
                _ => {
                    diff.insert(field.clone(), value.clone());
                }
            }
        }

        for field in prev.keys() {
            if !current.contains_key(field) {
                diff.insert(field.clone(), Value::Null);
            }
        }

        diff
    }
}

impl PayloadTransform for DeltaEncoder {
    fn apply(&mut self, client: &ClientId, point: &mut DataPoint) -> TransformOutcome {
        // A cache reference carries no fields worth diffing.
        if point.compressed {
            return TransformOutcome::Full;
        }

        let key = (client.clone(), point.topic.clone());

        let diff = match self.last_full.get(&key) {
            Some(prev) => match (prev.as_object(), point.payload.as_object()) {
                (Some(prev_obj), Some(curr_obj)) => Some(Self::shallow_diff(prev_obj, curr_obj)),
                _ => None,
            },
            None => None,
        };

        self.last_full.insert(key, point.payload.clone());

        match diff {
            Some(fields) => {
                point.payload = Value::Object(fields);
                point.delta = true;
                TransformOutcome::Diffed
            }
            None => TransformOutcome::Full,
        }
    }

    fn forget_client(&mut self, client: &ClientId) {
        self.last_full.retain(|(id, _), _| id != client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(payload: Value) -> DataPoint {
        DataPoint::generated(Topic::new("performance").unwrap(), payload)
    }

    #[test]
    fn test_first_delivery_is_full() {
        let mut encoder = DeltaEncoder::new();
        let client = ClientId::from("c1");
        let mut p = point(json!({"lcp": 2.1, "cls": 0.05}));

        assert_eq!(encoder.apply(&client, &mut p), TransformOutcome::Full);
        assert!(!p.delta);
    }

    #[test]
    fn test_changed_fields_only() {
        let mut encoder = DeltaEncoder::new();
        let client = ClientId::from("c1");

        let mut first = point(json!({"lcp": 2.1, "cls": 0.05, "ttfb": 310}));
        encoder.apply(&client, &mut first);

        let mut second = point(json!({"lcp": 2.4, "cls": 0.05, "ttfb": 310}));
        assert_eq!(encoder.apply(&client, &mut second), TransformOutcome::Diffed);
        assert!(second.delta);
        assert_eq!(second.payload, json!({"lcp": 2.4}));
    }

    #[test]
    fn test_removed_field_marked_null() {
        let mut encoder = DeltaEncoder::new();
        let client = ClientId::from("c1");

        let mut first = point(json!({"lcp": 2.1, "cls": 0.05}));
        encoder.apply(&client, &mut first);

        let mut second = point(json!({"lcp": 2.1}));
        encoder.apply(&client, &mut second);
        assert_eq!(second.payload, json!({"cls": null}));
    }

    #[test]
    fn test_deltas_chain_against_latest_full_payload() {
        let mut encoder = DeltaEncoder::new();
        let client = ClientId::from("c1");

        let mut first = point(json!({"lcp": 2.1}));
        encoder.apply(&client, &mut first);

        let mut second = point(json!({"lcp": 2.4}));
        encoder.apply(&client, &mut second);

        // Third delivery diffs against the second's full payload, not the first's
        let mut third = point(json!({"lcp": 2.4, "cls": 0.1}));
        encoder.apply(&client, &mut third);
        assert_eq!(third.payload, json!({"cls": 0.1}));
    }

    #[test]
    fn test_non_object_payload_passes_through() {
        let mut encoder = DeltaEncoder::new();
        let client = ClientId::from("c1");

        let mut first = point(json!([1, 2, 3]));
        encoder.apply(&client, &mut first);

        let mut second = point(json!([4, 5, 6]));
        assert_eq!(encoder.apply(&client, &mut second), TransformOutcome::Full);
        assert_eq!(second.payload, json!([4, 5, 6]));
    }

    #[test]
    fn test_compressed_point_skipped() {
        let mut encoder = DeltaEncoder::new();
        let client = ClientId::from("c1");

        let mut first = point(json!({"lcp": 2.1}));
        encoder.apply(&client, &mut first);

        let mut compressed = point(json!({"cache_ref": "abc"}));
        compressed.compressed = true;
        assert_eq!(
            encoder.apply(&client, &mut compressed),
            TransformOutcome::Full
        );
        assert!(!compressed.delta);
        assert_eq!(compressed.payload, json!({"cache_ref": "abc"}));
    }
}
