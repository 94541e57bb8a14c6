//! Bridge controller - routes broker events into the sensor core
//!
//! ```text
//! InboundMessage ──► reading?  ──yes──► registry lookup ──new──► configure_sensor
//!                       │                     └──known──► update + publish_state
//!                       └──no───► CommandRouter ──► device command topic
//! ```
//!
//! The controller is the [`MessageHandler`] of the MQTT link. None of its
//! failures leave the handler: they are logged and the next message is
//! processed normally.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::command_router::CommandRouter;
use super::liveness::LivenessSweeper;
use crate::error::BridgeError;
use crate::hass::DiscoveryPublisher;
use crate::mqtt::message_manager::{InboundMessage, Reading};
use crate::mqtt::{MessageHandler, Transport};
use crate::sensors::{Sensor, SensorRegistry, SensorTypeCatalog};

/// What the controller did with one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// First reading of a pair; the sensor was announced to the hub
    Discovered,
    /// Reading for a known sensor; `changed` tells whether the value moved
    Updated { changed: bool },
    /// Hub command relayed to the device
    Relayed,
    /// Nothing to do (unknown reading topic, unowned command, failed publish)
    Ignored,
}

pub struct BridgeController {
    catalog: Arc<SensorTypeCatalog>,
    registry: Arc<SensorRegistry>,
    transport: Arc<dyn Transport>,
    discovery: DiscoveryPublisher,
    router: CommandRouter,
    connected: AtomicBool,
}

impl BridgeController {
    pub fn new(
        catalog: Arc<SensorTypeCatalog>,
        transport: Arc<dyn Transport>,
        manufacturer: impl Into<String>,
    ) -> Self {
        let registry = Arc::new(SensorRegistry::new());
        let discovery = DiscoveryPublisher::new(transport.clone(), registry.clone(), manufacturer);
        let router = CommandRouter::new(transport.clone(), registry.clone());
        Self {
            catalog,
            registry,
            transport,
            discovery,
            router,
            connected: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> Arc<SensorRegistry> {
        self.registry.clone()
    }

    /// Sweeper sharing this controller's registry and publisher
    pub fn liveness_sweeper(&self, timeout_minutes: u64) -> LivenessSweeper {
        LivenessSweeper::new(self.registry.clone(), self.discovery.clone(), timeout_minutes)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Subscribes every reading topic and the required command wildcards.
    pub fn subscribe(&self) -> Result<(), BridgeError> {
        let filters = self.catalog.subscriptions();
        for filter in &filters {
            self.transport.subscribe(filter)?;
            debug!("Subscribed to {}", filter);
        }
        info!("Subscribed to {} topics", filters.len());
        Ok(())
    }

    pub fn dispatch(&self, message: &InboundMessage, now: DateTime<Local>) -> Dispatch {
        match message.reading() {
            Some(reading) => self.handle_reading(&message.topic, reading, now),
            None => self.handle_command(&message.topic, &message.payload),
        }
    }

    fn handle_reading(&self, topic: &str, reading: Reading<'_>, now: DateTime<Local>) -> Dispatch {
        let Some(sensor_type) = self.catalog.resolve(topic) else {
            warn!(
                "No sensor type for topic '{}', dropping reading from '{}'",
                topic, reading.device_id
            );
            return Dispatch::Ignored;
        };

        if self
            .registry
            .find(reading.device_id, reading.sensor_name)
            .is_none()
        {
            let sensor = Sensor::new(
                reading.device_id,
                reading.sensor_name,
                reading.sensor_value,
                sensor_type,
            );
            return match self.discovery.configure_sensor(sensor, now) {
                Ok(_) => Dispatch::Discovered,
                Err(e) => {
                    error!(
                        "Failed to configure sensor '{}' of '{}': {}",
                        reading.sensor_name, reading.device_id, e
                    );
                    Dispatch::Ignored
                }
            };
        }

        let Some((sensor, changed)) = self.registry.update(
            reading.device_id,
            reading.sensor_name,
            reading.sensor_value,
            now,
        ) else {
            // Evicted by the sweep between lookup and update
            return Dispatch::Ignored;
        };

        if let Err(e) = self.discovery.publish_state(&sensor, now) {
            error!("Failed to publish state of '{}': {}", sensor.unique_id(), e);
        }
        Dispatch::Updated { changed }
    }

    fn handle_command(&self, topic: &str, raw: &str) -> Dispatch {
        match self.router.route(topic, raw) {
            Ok(true) => Dispatch::Relayed,
            Ok(false) => Dispatch::Ignored,
            Err(e) => {
                error!("Failed to relay command from '{}': {}", topic, e);
                Dispatch::Ignored
            }
        }
    }
}

impl MessageHandler for BridgeController {
    fn on_connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        if let Err(e) = self.subscribe() {
            error!("Failed to subscribe: {}", e);
        }
    }

    fn on_message(&self, message: &InboundMessage) {
        debug!("Received {}", message);
        self.dispatch(message, Local::now());
    }

    fn on_disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        error!("Disconnected");
    }
}
