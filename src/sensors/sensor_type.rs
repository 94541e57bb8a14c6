//! Sensor type definitions and entity-kind classification
//!
//! A [`SensorType`] is loaded once from the configuration file and shared by
//! every [`Sensor`](super::sensor::Sensor) reporting on its topic. The hub
//! entity kind of a sensor is never stored; it is derived from the type's
//! capability fields by [`EntityKind::classify`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::hass::topics;

fn default_step() -> f64 {
    1.0
}

/// Static definition of one family of sensors sharing an inbound topic.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SensorType {
    /// Human readable type name, reported to the hub as the device model
    pub name: String,
    /// Topic the devices publish their pipe-delimited readings on
    pub topic: String,
    #[serde(default)]
    pub unit_of_measurement: Option<String>,
    #[serde(default)]
    pub device_class: Option<String>,
    /// Device-side command channel; hub commands are relayed here
    #[serde(default)]
    pub command_topic: Option<String>,
    /// Enumerated values for select entities
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default = "default_step")]
    pub step: f64,
}

impl SensorType {
    /// Entity kind the hub sees for sensors of this type.
    pub fn kind(&self) -> EntityKind {
        EntityKind::classify(self)
    }

    fn has_options(&self) -> bool {
        self.options.as_ref().is_some_and(|options| !options.is_empty())
    }

    /// Command wildcards this type needs on the hub side.
    ///
    /// These follow the capability flags directly and are evaluated
    /// independently of each other, so a misconfigured type may ask for more
    /// than one wildcard.
    pub fn command_wildcards(&self) -> Vec<EntityKind> {
        let mut kinds = Vec::new();
        if self.command_topic.is_some() && !self.has_options() {
            kinds.push(EntityKind::Switch);
        }
        if self.has_options() {
            kinds.push(EntityKind::Select);
        }
        if self.min.is_some() && self.max.is_some() {
            kinds.push(EntityKind::Number);
        }
        kinds
    }
}

/// Home Assistant entity kinds the bridge can announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Read-only value, no command topic
    Sensor,
    /// On/off toggle
    Switch,
    /// One value out of an enumerated list
    Select,
    /// Bounded numeric input
    Number,
}

impl EntityKind {
    /// Kinds that carry a hub-side `.../set` command topic.
    pub const COMMANDABLE: [EntityKind; 3] =
        [EntityKind::Switch, EntityKind::Select, EntityKind::Number];

    /// Derives the entity kind from a type's capability fields.
    ///
    /// First match wins:
    /// 1. command topic without options, min and max -> switch
    ///    (an empty options list counts as no options)
    /// 2. non-empty options without min -> select
    /// 3. min and max (step always has a value) -> number
    /// 4. anything else -> sensor
    pub fn classify(sensor_type: &SensorType) -> Self {
        if sensor_type.command_topic.is_some()
            && !sensor_type.has_options()
            && sensor_type.min.is_none()
            && sensor_type.max.is_none()
        {
            EntityKind::Switch
        } else if sensor_type.has_options() && sensor_type.min.is_none() {
            EntityKind::Select
        } else if sensor_type.min.is_some() && sensor_type.max.is_some() {
            EntityKind::Number
        } else {
            EntityKind::Sensor
        }
    }

    /// Topic path segment used by the hub for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Sensor => "sensor",
            EntityKind::Switch => "switch",
            EntityKind::Select => "select",
            EntityKind::Number => "number",
        }
    }

    pub fn accepts_commands(&self) -> bool {
        !matches!(self, EntityKind::Sensor)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load-once, read-only table of sensor types in configuration order.
#[derive(Debug, Clone, Default)]
pub struct SensorTypeCatalog {
    types: Vec<Arc<SensorType>>,
}

impl SensorTypeCatalog {
    pub fn new(types: Vec<SensorType>) -> Self {
        Self {
            types: types.into_iter().map(Arc::new).collect(),
        }
    }

    /// First type whose reading topic equals `topic` exactly.
    pub fn resolve(&self, topic: &str) -> Option<Arc<SensorType>> {
        self.types.iter().find(|t| t.topic == topic).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SensorType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Distinct topic filters to subscribe after every (re)connect.
    ///
    /// Reading topics come first in catalog order, followed by the hub command
    /// wildcards in the order they were first required.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut filters: Vec<String> = Vec::new();
        let mut wildcards: Vec<String> = Vec::new();

        for sensor_type in &self.types {
            if !filters.contains(&sensor_type.topic) {
                filters.push(sensor_type.topic.clone());
            }
            for kind in sensor_type.command_wildcards() {
                let wildcard = topics::command_wildcard(kind);
                if !wildcards.contains(&wildcard) {
                    wildcards.push(wildcard);
                }
            }
        }

        for wildcard in wildcards {
            if !filters.contains(&wildcard) {
                filters.push(wildcard);
            }
        }
        filters
    }

    /// Reading topics claimed by more than one type. Only the first type of
    /// each such topic is ever resolved.
    pub fn shared_topics(&self) -> Vec<&str> {
        let mut shared: Vec<&str> = Vec::new();
        for (idx, sensor_type) in self.types.iter().enumerate() {
            let topic = sensor_type.topic.as_str();
            if self.types[..idx].iter().any(|t| t.topic == topic) && !shared.contains(&topic) {
                shared.push(topic);
            }
        }
        shared
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn plain_type(name: &str, topic: &str) -> SensorType {
        SensorType {
            name: name.to_string(),
            topic: topic.to_string(),
            unit_of_measurement: Some("°C".to_string()),
            device_class: Some("temperature".to_string()),
            command_topic: None,
            options: None,
            min: None,
            max: None,
            step: 1.0,
        }
    }

    pub(crate) fn switch_type(name: &str, topic: &str, command_topic: &str) -> SensorType {
        SensorType {
            unit_of_measurement: None,
            device_class: Some("switch".to_string()),
            command_topic: Some(command_topic.to_string()),
            ..plain_type(name, topic)
        }
    }

    #[test]
    fn test_classify_plain_sensor() {
        assert_eq!(
            EntityKind::classify(&plain_type("Temp", "devices/temp")),
            EntityKind::Sensor
        );
    }

    #[test]
    fn test_classify_switch() {
        let relay = switch_type("Relay", "devices/relay", "devices/relay/set");
        assert_eq!(relay.kind(), EntityKind::Switch);
    }

    #[test]
    fn test_empty_options_classify_as_switch() {
        let mut relay = switch_type("Relay", "devices/relay", "devices/relay/set");
        relay.options = Some(vec![]);
        assert_eq!(relay.kind(), EntityKind::Switch);
        assert_eq!(relay.command_wildcards(), vec![EntityKind::Switch]);
    }

    #[test]
    fn test_options_always_win_over_command_topic() {
        let mut mode = switch_type("Mode", "devices/mode", "devices/mode/set");
        mode.options = Some(vec!["eco".to_string(), "boost".to_string()]);
        assert_eq!(mode.kind(), EntityKind::Select);

        mode.command_topic = None;
        assert_eq!(mode.kind(), EntityKind::Select);
    }

    #[test]
    fn test_classify_number() {
        let mut level = switch_type("Level", "devices/level", "devices/level/set");
        level.min = Some(0.0);
        level.max = Some(100.0);
        level.step = 5.0;
        assert_eq!(level.kind(), EntityKind::Number);
    }

    #[test]
    fn test_options_with_min_fall_through() {
        let mut odd = plain_type("Odd", "devices/odd");
        odd.options = Some(vec!["a".to_string()]);
        odd.min = Some(1.0);
        assert_eq!(odd.kind(), EntityKind::Sensor);

        odd.max = Some(2.0);
        assert_eq!(odd.kind(), EntityKind::Number);
    }

    #[test]
    fn test_min_without_max_is_sensor() {
        let mut half = plain_type("Half", "devices/half");
        half.min = Some(0.0);
        assert_eq!(half.kind(), EntityKind::Sensor);
    }

    #[test]
    fn test_catalog_resolves_first_match() {
        let catalog = SensorTypeCatalog::new(vec![
            plain_type("First", "devices/shared"),
            plain_type("Second", "devices/shared"),
            plain_type("Other", "devices/other"),
        ]);

        assert_eq!(catalog.resolve("devices/shared").unwrap().name, "First");
        assert_eq!(catalog.resolve("devices/other").unwrap().name, "Other");
        assert!(catalog.resolve("devices/unknown").is_none());
        assert_eq!(catalog.shared_topics(), vec!["devices/shared"]);
    }

    #[test]
    fn test_subscriptions_are_distinct() {
        let mut mode = plain_type("Mode", "devices/mode");
        mode.options = Some(vec!["a".to_string(), "b".to_string()]);
        let mut level = plain_type("Level", "devices/level");
        level.min = Some(0.0);
        level.max = Some(10.0);

        let catalog = SensorTypeCatalog::new(vec![
            plain_type("Temp", "devices/temp"),
            switch_type("Relay", "devices/relay", "devices/relay/set"),
            switch_type("Relay2", "devices/relay", "devices/relay/set"),
            mode,
            level,
        ]);

        assert_eq!(
            catalog.subscriptions(),
            vec![
                "devices/temp",
                "devices/relay",
                "devices/mode",
                "devices/level",
                "homeassistant/switch/#",
                "homeassistant/select/#",
                "homeassistant/number/#",
            ]
        );
    }
}
