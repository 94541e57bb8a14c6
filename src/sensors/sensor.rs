use chrono::{DateTime, Local, TimeDelta};
use std::sync::Arc;
use tracing::info;

use super::sensor_type::{EntityKind, SensorType};

/// Lowercases a device or sensor name and replaces spaces with underscores.
pub fn flatten_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Live record for one `(device_id, sensor_name)` pair.
///
/// The flattened names are computed once on creation and used as the
/// sensor's identity in every hub topic.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub device_id: String,
    pub sensor_name: String,
    pub sensor_value: String,
    pub sensor_type: Arc<SensorType>,
    configured: bool,
    last_updated: Option<DateTime<Local>>,
    device_flat_name: String,
    sensor_flat_name: String,
}

impl Sensor {
    pub fn new(
        device_id: impl Into<String>,
        sensor_name: impl Into<String>,
        sensor_value: impl Into<String>,
        sensor_type: Arc<SensorType>,
    ) -> Self {
        let device_id = device_id.into();
        let sensor_name = sensor_name.into();
        Self {
            device_flat_name: flatten_name(&device_id),
            sensor_flat_name: flatten_name(&sensor_name),
            device_id,
            sensor_name,
            sensor_value: sensor_value.into(),
            sensor_type,
            configured: false,
            last_updated: None,
        }
    }

    pub fn matches(&self, device_id: &str, sensor_name: &str) -> bool {
        self.device_id == device_id && self.sensor_name == sensor_name
    }

    pub fn device_flat_name(&self) -> &str {
        &self.device_flat_name
    }

    pub fn sensor_flat_name(&self) -> &str {
        &self.sensor_flat_name
    }

    /// `{device_flat}_{sensor_flat}`, the hub-side unique id
    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.device_flat_name, self.sensor_flat_name)
    }

    pub fn kind(&self) -> EntityKind {
        self.sensor_type.kind()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Flags the sensor as announced to the hub. There is no way back.
    pub fn mark_configured(&mut self) {
        self.configured = true;
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    pub fn touch(&mut self, now: DateTime<Local>) {
        self.last_updated = Some(now);
    }

    /// Stores a new reading. Returns whether the value actually changed.
    pub fn update(&mut self, sensor_value: &str, now: DateTime<Local>) -> bool {
        let changed = self.sensor_value != sensor_value;
        if changed {
            info!(
                "Sensor [{}] '{}' updated: {} -> {}",
                self.sensor_type.name, self.sensor_name, self.sensor_value, sensor_value
            );
            self.sensor_value = sensor_value.to_string();
        }
        self.last_updated = Some(now);
        changed
    }

    /// True once the last update is strictly older than `timeout`.
    /// A sensor that was never updated is never stale.
    pub fn is_stale(&self, now: DateTime<Local>, timeout: TimeDelta) -> bool {
        self.last_updated
            .is_some_and(|last_updated| now - last_updated > timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::sensor_type::tests::{plain_type, switch_type};

    #[test]
    fn test_flatten_name() {
        assert_eq!(flatten_name("Pump1"), "pump1");
        assert_eq!(flatten_name("Living Room Temp"), "living_room_temp");
        assert_eq!(flatten_name("already_flat"), "already_flat");
    }

    #[test]
    fn test_new_sensor_identity() {
        let sensor = Sensor::new(
            "Boiler Room",
            "Water Temp",
            "21.5",
            Arc::new(plain_type("Temp", "devices/temp")),
        );
        assert_eq!(sensor.device_flat_name(), "boiler_room");
        assert_eq!(sensor.sensor_flat_name(), "water_temp");
        assert_eq!(sensor.unique_id(), "boiler_room_water_temp");
        assert!(!sensor.is_configured());
        assert!(sensor.last_updated().is_none());
        assert!(sensor.matches("Boiler Room", "Water Temp"));
        assert!(!sensor.matches("boiler_room", "water_temp"));
    }

    #[test]
    fn test_update_reports_change_once() {
        let mut sensor = Sensor::new(
            "Pump1",
            "Relay",
            "on",
            Arc::new(switch_type("Relay", "devices/relay", "devices/relay/set")),
        );
        let first = Local::now();
        let second = first + TimeDelta::seconds(3);

        assert!(sensor.update("off", first));
        assert_eq!(sensor.last_updated(), Some(first));

        assert!(!sensor.update("off", second));
        assert_eq!(sensor.last_updated(), Some(second));
        assert_eq!(sensor.sensor_value, "off");
    }

    #[test]
    fn test_staleness() {
        let mut sensor = Sensor::new(
            "Dev",
            "Temp",
            "1",
            Arc::new(plain_type("Temp", "devices/temp")),
        );
        let now = Local::now();
        let timeout = TimeDelta::seconds(60);
        assert!(!sensor.is_stale(now, timeout));

        sensor.touch(now - TimeDelta::seconds(60));
        assert!(!sensor.is_stale(now, timeout));

        sensor.touch(now - TimeDelta::seconds(61));
        assert!(sensor.is_stale(now, timeout));
    }
}
