//! MQTT link with statum state machine for the connection lifecycle
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected
//!      ▲               │              │
//!      │    (refused / │ io error)    │ (disconnect / io error)
//!      └───────────────┴──────────────┘
//!               retry every 5s, forever
//! ```
//!
//! The link owns the rumqttc event loop. Entering `Connected` calls
//! [`MessageHandler::on_connect`], every incoming publish is handed to
//! [`MessageHandler::on_message`] in delivery order, and losing the
//! connection calls [`MessageHandler::on_disconnect`] before the next attempt.

use rumqttc::{ConnectReturnCode, Event, EventLoop, Outgoing, Packet};
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::message_manager::InboundMessage;
use super::MessageHandler;

pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Clone, Debug, Default)]
pub struct MQTTStatus {
    pub connection_state: ConnectionState,
    pub connect_attempts: usize,
    pub messages_received: usize,
    pub messages_sent: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

/// States of the broker link using statum
#[state]
#[derive(Debug, Clone)]
pub enum LinkState {
    Disconnected, // Waiting for the next connection attempt
    Connecting,   // CONNECT sent, waiting for CONNACK
    Connected,    // Delivering events to the handler
}

/// Broker link with compile-time state safety via statum
#[machine]
pub struct MqttLink<S: LinkState> {
    eventloop: EventLoop,
    handler: Arc<dyn MessageHandler>,
    status: MQTTStatus,
    reconnect_interval: Duration,
}

impl<S: LinkState> MqttLink<S> {
    pub fn status(&self) -> &MQTTStatus {
        &self.status
    }
}

impl MqttLink<Disconnected> {
    pub fn create(eventloop: EventLoop, handler: Arc<dyn MessageHandler>) -> Self {
        Self::new(
            eventloop,
            handler,
            MQTTStatus::default(),
            RECONNECT_INTERVAL,
        )
    }

    pub fn connect(mut self) -> MqttLink<Connecting> {
        self.status.connect_attempts += 1;
        self.status.connection_state = ConnectionState::Connecting;
        info!(
            "Connecting to broker (attempt {})",
            self.status.connect_attempts
        );
        self.transition()
    }

    /// Drives the link forever: connect, serve, wait, repeat.
    pub async fn run(self) {
        let mut link = self;
        loop {
            link = match link.connect().establish().await {
                Ok(connected) => connected.serve().await,
                Err(disconnected) => disconnected,
            };
            info!(
                "Reconnecting in {}s...",
                link.reconnect_interval.as_secs()
            );
            tokio::time::sleep(link.reconnect_interval).await;
        }
    }
}

impl MqttLink<Connecting> {
    /// Polls until the broker answers the CONNECT packet.
    pub async fn establish(mut self) -> Result<MqttLink<Connected>, MqttLink<Disconnected>> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!("Connected with result code {:?}", ack.code);
                        self.status.connection_state = ConnectionState::Connected;
                        self.status.last_activity = Some(chrono::Local::now());
                        return Ok(self.transition());
                    }
                    // Refusals normally surface as ConnectionRefused in the Err arm
                    error!("Broker refused connection: {:?}", ack.code);
                    self.status.connection_state = ConnectionState::Disconnected;
                    return Err(self.transition());
                }
                Ok(event) => {
                    debug!("Event before CONNACK: {:?}", event);
                }
                Err(e) => {
                    error!("Connection failed: {}", e);
                    self.status.connection_state = ConnectionState::Disconnected;
                    return Err(self.transition());
                }
            }
        }
    }
}

impl MqttLink<Connected> {
    /// Delivers events to the handler until the connection drops.
    pub async fn serve(mut self) -> MqttLink<Disconnected> {
        self.handler.on_connect();

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.status.messages_received += 1;
                    self.status.last_activity = Some(chrono::Local::now());
                    let message = InboundMessage::from_topic(publish.topic, &publish.payload);
                    self.handler.on_message(&message);
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("Broker closed the session");
                    break;
                }
                Ok(Event::Outgoing(Outgoing::Publish(_))) => {
                    self.status.messages_sent += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Connection lost: {}", e);
                    break;
                }
            }
        }

        info!(
            "Session ended after {} received / {} sent messages",
            self.status.messages_received, self.status.messages_sent
        );
        self.status.connection_state = ConnectionState::Disconnected;
        self.handler.on_disconnect();
        self.transition()
    }
}
