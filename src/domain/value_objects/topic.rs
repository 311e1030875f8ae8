use crate::domain::errors::StreamError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved topic carrying collaboration traffic between dashboard peers.
pub const USER_ACTION_TOPIC: &str = "user-action";

/// A named category of streamed data that clients subscribe to.
///
/// Names are lowercase alphanumeric with dashes (e.g. "seo-metrics",
/// "keyword-ranking"). Input is lowercased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    pub fn new(value: impl Into<String>) -> Result<Self, StreamError> {
        let s: String = value.into();
        if s.is_empty() {
            return Err(StreamError::InvalidTopic("name is empty".to_string()));
        }
        if s.len() > 64 {
            return Err(StreamError::InvalidTopic(format!(
                "name too long ({} chars, max 64)",
                s.len()
            )));
        }
        let s = s.to_ascii_lowercase();
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(StreamError::InvalidTopic(format!(
                "'{}' contains characters outside [a-z0-9-]",
                s
            )));
        }
        Ok(Topic(s))
    }

    /// The reserved collaboration topic.
    pub fn user_action() -> Self {
        Topic(USER_ACTION_TOPIC.to_string())
    }

    pub fn is_user_action(&self) -> bool {
        self.0 == USER_ACTION_TOPIC
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Topic {
    type Error = StreamError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Topic::new(value)
    }
}

impl TryFrom<String> for Topic {
    type Error = StreamError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Topic::new(value)
    }
}
