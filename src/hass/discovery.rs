//! Discovery, state and availability publishing
//!
//! A sensor is announced once on its `config` topic, then every reading
//! republishes availability and state.
//! The payload shape depends on the [`EntityKind`] derived from the sensor's
//! type:
//!
//! | Kind   | Extra fields                                          |
//! |--------|-------------------------------------------------------|
//! | sensor | none                                                  |
//! | switch | `command_topic`, `state_on/off`, `payload_on/off`     |
//! | select | `command_topic`, `options`                            |
//! | number | `command_topic`, `min`, `max`, `step`                 |

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::topics::{self, PAYLOAD_OFFLINE, PAYLOAD_ONLINE};
use crate::error::BridgeError;
use crate::mqtt::Transport;
use crate::sensors::{EntityKind, Sensor, SensorRegistry};

pub const DEFAULT_MANUFACTURER: &str = "Fontana Software";

const SWITCH_ON: &str = "on";
const SWITCH_OFF: &str = "off";

/// `device` block grouping all sensors of one physical device in the hub.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
}

/// Discovery configuration message for one entity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscoveryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    pub name: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    pub value_template: String,
    pub unique_id: String,
    pub platform: &'static str,
    pub availability_topic: String,
    pub payload_available: &'static str,
    pub payload_not_available: &'static str,
    pub device: DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_off: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl DiscoveryPayload {
    pub fn build(sensor: &Sensor, kind: EntityKind, manufacturer: &str) -> Self {
        let sensor_type = &sensor.sensor_type;
        let mut payload = DiscoveryPayload {
            device_class: sensor_type.device_class.clone(),
            name: sensor.sensor_name.clone(),
            state_topic: topics::state_topic(kind, sensor),
            unit_of_measurement: sensor_type.unit_of_measurement.clone(),
            value_template: format!("{{{{ value_json.{} }}}}", sensor.sensor_flat_name()),
            unique_id: sensor.unique_id(),
            platform: "mqtt",
            availability_topic: topics::availability_topic(sensor),
            payload_available: PAYLOAD_ONLINE,
            payload_not_available: PAYLOAD_OFFLINE,
            device: DeviceInfo {
                identifiers: vec![sensor.device_flat_name().to_string()],
                name: sensor.device_id.clone(),
                model: sensor_type.name.clone(),
                manufacturer: manufacturer.to_string(),
            },
            command_topic: None,
            state_on: None,
            state_off: None,
            payload_on: None,
            payload_off: None,
            options: None,
            min: None,
            max: None,
            step: None,
        };

        if kind.accepts_commands() {
            payload.command_topic = Some(topics::command_topic(kind, sensor));
        }

        match kind {
            EntityKind::Sensor => {}
            EntityKind::Switch => {
                payload.state_on = Some(SWITCH_ON);
                payload.state_off = Some(SWITCH_OFF);
                payload.payload_on = Some(SWITCH_ON);
                payload.payload_off = Some(SWITCH_OFF);
            }
            EntityKind::Select => {
                payload.options = sensor_type.options.clone();
            }
            EntityKind::Number => {
                payload.min = sensor_type.min;
                payload.max = sensor_type.max;
                payload.step = Some(sensor_type.step);
            }
        }

        payload
    }
}

/// Publishes everything the hub learns about a sensor.
#[derive(Clone)]
pub struct DiscoveryPublisher {
    transport: Arc<dyn Transport>,
    registry: Arc<SensorRegistry>,
    manufacturer: String,
}

impl DiscoveryPublisher {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<SensorRegistry>,
        manufacturer: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            registry,
            manufacturer: manufacturer.into(),
        }
    }

    /// Announces a new sensor, registers it and publishes its first state.
    ///
    /// This is the only path adding sensors to the registry. If the discovery
    /// publish fails the sensor is not registered and the next reading tries
    /// again. Once registered, a failed state publish is only logged; the
    /// next reading republishes it.
    pub fn configure_sensor(
        &self,
        mut sensor: Sensor,
        now: DateTime<Local>,
    ) -> Result<Sensor, BridgeError> {
        let kind = sensor.kind();
        let payload = DiscoveryPayload::build(&sensor, kind, &self.manufacturer);
        let body = serde_json::to_string(&payload)?;

        self.transport
            .publish(&topics::config_topic(kind, &sensor), &body)?;

        sensor.mark_configured();
        sensor.touch(now);
        self.registry.insert(sensor.clone());
        info!(
            "Sensor [{}] type:{} '{}' configured",
            sensor.sensor_type.name, kind, sensor.sensor_name
        );

        if let Err(e) = self.publish_state(&sensor, now) {
            warn!(
                "Sensor '{}' configured but state publish failed: {}",
                sensor.unique_id(),
                e
            );
        }
        Ok(sensor)
    }

    /// Marks the sensor online and publishes `{"<sensor_flat>": "<value>"}`.
    pub fn publish_state(&self, sensor: &Sensor, now: DateTime<Local>) -> Result<(), BridgeError> {
        self.registry
            .touch(&sensor.device_id, &sensor.sensor_name, now);

        let mut state = Map::new();
        state.insert(
            sensor.sensor_flat_name().to_string(),
            Value::String(sensor.sensor_value.clone()),
        );
        let body = serde_json::to_string(&Value::Object(state))?;

        self.transport
            .publish(&topics::availability_topic(sensor), PAYLOAD_ONLINE)?;
        self.transport
            .publish(&topics::state_topic(sensor.kind(), sensor), &body)?;
        debug!("Published state of '{}': {}", sensor.unique_id(), body);
        Ok(())
    }

    pub fn publish_offline(&self, sensor: &Sensor) -> Result<(), BridgeError> {
        self.transport
            .publish(&topics::availability_topic(sensor), PAYLOAD_OFFLINE)
    }
}
