//! Offline detection for silent sensors
//!
//! Runs as its own tokio task next to the MQTT link. Every tick it evicts
//! sensors whose last update is older than the configured timeout and tells
//! the hub they went offline. A sensor reporting again afterwards is
//! rediscovered from scratch.

use chrono::{DateTime, Local, TimeDelta};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hass::DiscoveryPublisher;
use crate::sensors::{Sensor, SensorRegistry};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct LivenessSweeper {
    registry: Arc<SensorRegistry>,
    publisher: DiscoveryPublisher,
    timeout: TimeDelta,
    interval: Duration,
}

impl LivenessSweeper {
    pub fn new(
        registry: Arc<SensorRegistry>,
        publisher: DiscoveryPublisher,
        timeout_minutes: u64,
    ) -> Self {
        Self {
            registry,
            publisher,
            timeout: i64::try_from(timeout_minutes.saturating_mul(60))
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX),
            interval: SWEEP_INTERVAL,
        }
    }

    pub fn timeout(&self) -> TimeDelta {
        self.timeout
    }

    /// One sweep tick. Returns the sensors taken offline.
    ///
    /// `offline` is published before each sensor leaves the registry, so a
    /// concurrent reading always announces `online` after it.
    pub fn sweep(&self, now: DateTime<Local>) -> Vec<Sensor> {
        let evicted = self.registry.evict_stale(now, self.timeout, |sensor| {
            if let Err(e) = self.publisher.publish_offline(sensor) {
                warn!("Failed to publish offline state: {}", e);
            }
        });
        for sensor in &evicted {
            info!(
                "Sensor [{}] '{}' offline",
                sensor.sensor_type.name, sensor.sensor_name
            );
        }
        evicted
    }

    /// Spawns the perpetual sweep loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Liveness sweep every {}s, offline after {}s",
                self.interval.as_secs(),
                self.timeout.num_seconds()
            );
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                let evicted = self.sweep(Local::now());
                debug!(
                    "Sweep done: {} evicted, {} live",
                    evicted.len(),
                    self.registry.len()
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hass::DEFAULT_MANUFACTURER;
    use crate::mqtt::testing::RecordingTransport;
    use crate::sensors::sensor_type::tests::plain_type;

    fn sweeper() -> (LivenessSweeper, Arc<RecordingTransport>, Arc<SensorRegistry>) {
        let transport = Arc::new(RecordingTransport::default());
        let registry = Arc::new(SensorRegistry::new());
        let publisher =
            DiscoveryPublisher::new(transport.clone(), registry.clone(), DEFAULT_MANUFACTURER);
        (
            LivenessSweeper::new(registry.clone(), publisher, 1),
            transport,
            registry,
        )
    }

    fn sensor_updated_at(name: &str, at: DateTime<Local>) -> Sensor {
        let mut sensor = Sensor::new(
            "Dev",
            name,
            "1",
            Arc::new(plain_type("Temp", "devices/temp")),
        );
        sensor.touch(at);
        sensor
    }

    #[test]
    fn test_timeout_from_minutes() {
        let (sweeper, _, _) = sweeper();
        assert_eq!(sweeper.timeout(), TimeDelta::seconds(60));
    }

    #[test]
    fn test_stale_sensor_goes_offline_once() {
        let (sweeper, transport, registry) = sweeper();
        let now = Local::now();
        registry.insert(sensor_updated_at("Old", now - TimeDelta::seconds(90)));
        registry.insert(sensor_updated_at("Fresh", now - TimeDelta::seconds(30)));

        let evicted = sweeper.sweep(now);
        assert_eq!(evicted.len(), 1);
        assert_eq!(
            transport.published(),
            vec![(
                "homeassistant/dev_old/availability".to_string(),
                "offline".to_string()
            )]
        );

        assert!(sweeper.sweep(now).is_empty());
        assert_eq!(transport.published().len(), 1);
        assert!(registry.find("Dev", "Fresh").is_some());
        assert!(registry.find("Dev", "Old").is_none());
    }

    #[test]
    fn test_sensor_updated_within_window_survives() {
        let (sweeper, transport, registry) = sweeper();
        let start = Local::now();
        registry.insert(sensor_updated_at("Temp", start));

        for tick in 1..=12 {
            let now = start + TimeDelta::seconds(tick * 10);
            registry.touch("Dev", "Temp", now);
            assert!(sweeper.sweep(now).is_empty());
        }
        assert_eq!(registry.len(), 1);
        assert!(transport.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_evicts() {
        let (sweeper, transport, registry) = sweeper();
        registry.insert(sensor_updated_at(
            "Old",
            Local::now() - TimeDelta::seconds(600),
        ));

        let handle = sweeper.spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(registry.is_empty());
        assert_eq!(
            transport.published_to("homeassistant/dev_old/availability"),
            vec!["offline"]
        );
        handle.abort();
    }
}
