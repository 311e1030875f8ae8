use crate::domain::{ClientId, DataPoint};

/// A per-client payload rewrite applied during fan-out.
///
/// Implementations own whatever cache they need. The dispatcher decides
/// which transforms run for a client from its tier-derived delivery
/// preferences; the transforms themselves are tier-agnostic so each can
/// be tested in isolation.
pub trait PayloadTransform: Send {
    /// Rewrite `point` in place for `client`.
    fn apply(&mut self, client: &ClientId, point: &mut DataPoint) -> TransformOutcome;

    /// Drop all cached state for a departed client.
    fn forget_client(&mut self, client: &ClientId);
}

/// What a transform did to the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Payload passed through unchanged (possibly cached for next time).
    Full,
    /// Payload was replaced by a cache reference; sizes are the serialized
    /// lengths used for the compression-ratio estimate.
    CacheHit {
        reference_len: usize,
        original_len: usize,
    },
    /// Payload was replaced by a field-level diff.
    Diffed,
}
