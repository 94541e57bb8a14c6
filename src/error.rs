//! Error definitions for the bridge core

use thiserror::Error;

/// Errors raised while talking to the broker or building hub payloads.
///
/// None of these are fatal: the controller logs them and keeps serving the
/// next message.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The client request queue refused a publish
    #[error("Failed to publish to '{topic}': {source}")]
    Publish {
        topic: String,
        #[source]
        source: rumqttc::ClientError,
    },

    /// The client request queue refused a subscription
    #[error("Failed to subscribe to '{filter}': {source}")]
    Subscribe {
        filter: String,
        #[source]
        source: rumqttc::ClientError,
    },

    /// A discovery or state payload could not be encoded
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
