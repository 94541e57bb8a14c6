//! Home Assistant topic grammar
//!
//! ```text
//! homeassistant/{kind}/{device_flat}/{sensor_flat}/config
//! homeassistant/{kind}/{device_flat}/{sensor_flat}/state
//! homeassistant/{kind}/{device_flat}/{sensor_flat}/set
//! homeassistant/{device_flat}_{sensor_flat}/availability
//! ```

use crate::sensors::{EntityKind, Sensor};

pub const DISCOVERY_PREFIX: &str = "homeassistant";

pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";

fn entity_topic(kind: EntityKind, sensor: &Sensor, suffix: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        DISCOVERY_PREFIX,
        kind,
        sensor.device_flat_name(),
        sensor.sensor_flat_name(),
        suffix
    )
}

pub fn config_topic(kind: EntityKind, sensor: &Sensor) -> String {
    entity_topic(kind, sensor, "config")
}

pub fn state_topic(kind: EntityKind, sensor: &Sensor) -> String {
    entity_topic(kind, sensor, "state")
}

/// Hub-side command topic; only meaningful for commandable kinds
pub fn command_topic(kind: EntityKind, sensor: &Sensor) -> String {
    entity_topic(kind, sensor, "set")
}

pub fn availability_topic(sensor: &Sensor) -> String {
    format!("{}/{}/availability", DISCOVERY_PREFIX, sensor.unique_id())
}

/// Subscription filter catching every command of one kind
pub fn command_wildcard(kind: EntityKind) -> String {
    format!("{}/{}/#", DISCOVERY_PREFIX, kind)
}
