use std::sync::Arc;
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::hass::topics;
use crate::mqtt::Transport;
use crate::sensors::{EntityKind, Sensor, SensorRegistry};

/// Relays hub commands back to the device that owns the entity.
#[derive(Clone)]
pub struct CommandRouter {
    transport: Arc<dyn Transport>,
    registry: Arc<SensorRegistry>,
}

impl CommandRouter {
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<SensorRegistry>) -> Self {
        Self {
            transport,
            registry,
        }
    }

    /// First known sensor with a device command channel whose hub command
    /// topic of any commandable kind equals `topic`.
    pub fn find_target(&self, topic: &str) -> Option<Sensor> {
        if !topic.ends_with("/set") {
            return None;
        }
        self.registry.all().into_iter().find(|sensor| {
            sensor.sensor_type.command_topic.is_some()
                && EntityKind::COMMANDABLE
                    .iter()
                    .any(|kind| topics::command_topic(*kind, sensor) == topic)
        })
    }

    /// Publishes `device_id|sensor_name|raw` to the device command topic.
    ///
    /// Returns `Ok(false)` when no sensor owns `topic`; such commands are
    /// dropped.
    pub fn route(&self, topic: &str, raw: &str) -> Result<bool, BridgeError> {
        let Some(sensor) = self.find_target(topic) else {
            debug!("No sensor owns command topic '{}', dropping", topic);
            return Ok(false);
        };
        let Some(device_topic) = sensor.sensor_type.command_topic.as_deref() else {
            return Ok(false);
        };

        let command = format!("{}|{}|{}", sensor.device_id, sensor.sensor_name, raw);
        self.transport.publish(device_topic, &command)?;
        info!("Relayed command '{}' to {}", command, device_topic);
        Ok(true)
    }
}
