pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

// Re-export entity types
pub use entities::{ClientDescriptor, ClientRegistration, ConnectionKind, DeliveryPrefs};

// Re-export events
pub use events::{
    CollaborationAction, CollaborationEvent, DataPoint, PointSource, StreamMetrics,
};

// Re-export errors
pub use errors::{QuotaScope, StreamError};

// Re-export value objects
pub use value_objects::{
    ClientId, DashboardId, QuotaTable, Tier, TierLimits, Topic, USER_ACTION_TOPIC, UserId,
};
