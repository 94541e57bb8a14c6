//! Home Assistant MQTT discovery
//!
//! Topic grammar and the payloads the hub expects for each entity kind.

pub mod discovery;
pub mod topics;

pub use discovery::{DiscoveryPayload, DiscoveryPublisher, DEFAULT_MANUFACTURER};
