use rumqttc::MqttOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

fn default_client_id() -> String {
    "sensorbridge".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

/// Broker address and credentials, read from the `[broker]` table.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct BrokerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl BrokerConfig {
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(&self.client_id, &self.host, self.port);
        mqtt_options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        if !self.username.is_empty() {
            mqtt_options.set_credentials(self.username.clone(), self.password.clone());
        }
        mqtt_options
    }
}

impl fmt::Display for BrokerConfig {
    /// Formats as "user@host:port", never showing the password.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_hides_password() {
        let broker = BrokerConfig {
            host: "broker.local".to_string(),
            port: 1883,
            username: "bridge".to_string(),
            password: "hunter2".to_string(),
            client_id: default_client_id(),
            keep_alive_secs: 60,
        };
        assert_eq!(broker.to_string(), "bridge@broker.local:1883");
    }

    #[test]
    fn test_mqtt_options() {
        let broker = BrokerConfig {
            host: "broker.local".to_string(),
            port: 1884,
            username: "bridge".to_string(),
            password: "secret".to_string(),
            client_id: "bridge-1".to_string(),
            keep_alive_secs: 30,
        };
        let options = broker.mqtt_options();
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 1884));
        assert_eq!(options.client_id(), "bridge-1");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }
}
