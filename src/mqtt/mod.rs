//! # MQTT Integration Module
//!
//! Connects the bridge to the broker through `rumqttc`. The rest of the crate
//! never touches client or event loop types directly; it only sees the two
//! seams defined here:
//!
//! - [`Transport`]: fire-and-forget publish and subscribe
//! - [`MessageHandler`]: one callback per connection event
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker address, credentials and client options
//! ├── message_manager.rs  - Inbound message and pipe-delimited reading format
//! └── mqtt_handler.rs     - Connection state machine and event dispatch
//! ```
//!
//! ## Event Flow
//!
//! ```text
//! EventLoop ──► MqttLink ──► MessageHandler::on_message ──► Transport::publish
//!                  │                                              │
//!                  └──── reconnect every 5s on failure ◄──────────┘
//! ```

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;

use rumqttc::{AsyncClient, QoS};

use crate::error::BridgeError;
use message_manager::InboundMessage;

/// Outbound side of the broker connection.
///
/// Implementations must not block: requests are queued and the call returns
/// immediately without waiting for an acknowledgment.
pub trait Transport: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BridgeError>;

    fn subscribe(&self, filter: &str) -> Result<(), BridgeError>;
}

impl Transport for AsyncClient {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BridgeError> {
        self.try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|source| BridgeError::Publish {
                topic: topic.to_string(),
                source,
            })
    }

    fn subscribe(&self, filter: &str) -> Result<(), BridgeError> {
        self.try_subscribe(filter, QoS::AtMostOnce)
            .map_err(|source| BridgeError::Subscribe {
                filter: filter.to_string(),
                source,
            })
    }
}

/// Receiver of connection events, invoked from the link task one event at a
/// time in delivery order.
pub trait MessageHandler: Send + Sync {
    /// The broker accepted the connection
    fn on_connect(&self);

    fn on_message(&self, message: &InboundMessage);

    /// The connection was lost; a reconnect attempt follows
    fn on_disconnect(&self);
}
