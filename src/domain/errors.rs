use crate::domain::value_objects::{ClientId, Tier};
use std::fmt;
use thiserror::Error;

/// Which quota a rejected request ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaScope {
    Connections,
    Subscriptions,
}

impl fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaScope::Connections => write!(f, "connection"),
            QuotaScope::Subscriptions => write!(f, "subscription"),
        }
    }
}

/// Errors returned synchronously to dispatcher callers.
///
/// Delivery failures are deliberately absent: a broken sink is converted
/// into an eviction inside the engine and never propagates outward.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("{scope} quota exceeded for tier {tier} (limit {limit})")]
    QuotaExceeded {
        scope: QuotaScope,
        tier: Tier,
        limit: u32,
    },

    #[error("client not found: {0}")]
    ClientNotFound(ClientId),

    #[error("client already registered: {0}")]
    DuplicateClient(ClientId),

    #[error("invalid tier: {0}")]
    InvalidTier(String),

    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    #[error("dispatcher is shut down")]
    EngineClosed,
}
