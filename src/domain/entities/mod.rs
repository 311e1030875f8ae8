mod client;

pub use client::{ClientDescriptor, ClientRegistration, ConnectionKind, DeliveryPrefs};
