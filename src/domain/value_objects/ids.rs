use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }
    };
}

opaque_id! {
    /// Opaque identifier for one client registration.
    ClientId
}

opaque_id! {
    /// Identifier of the user owning a registration.
    UserId
}

opaque_id! {
    /// Identifier of a shared dashboard session.
    DashboardId
}

impl ClientId {
    /// Generate a fresh identifier for a transport that did not supply one.
    pub fn generate() -> Self {
        ClientId(Uuid::new_v4().to_string())
    }
}

impl UserId {
    /// Producer id attached to engine-generated data points.
    pub fn system() -> Self {
        UserId("system".to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ClientId::generate(), ClientId::generate());
    }

    #[test]
    fn test_system_user() {
        assert!(UserId::system().is_system());
        assert!(!UserId::from("u-42").is_system());
    }
}
