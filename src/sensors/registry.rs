//! Shared table of live sensors
//!
//! Both the message-delivery task and the liveness sweep read and mutate the
//! registry. Every operation takes the internal lock for the duration of a
//! single call and hands back owned snapshots. The only code running under
//! the lock is the eviction callback of [`SensorRegistry::evict_stale`],
//! which must not block or call back into the registry.

use chrono::{DateTime, Local, TimeDelta};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::sensor::Sensor;

#[derive(Debug, Default)]
pub struct SensorRegistry {
    sensors: Mutex<Vec<Sensor>>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sensors(&self) -> MutexGuard<'_, Vec<Sensor>> {
        // No operation panics mid-mutation, a poisoned Vec is still consistent
        self.sensors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn find(&self, device_id: &str, sensor_name: &str) -> Option<Sensor> {
        self.sensors()
            .iter()
            .find(|s| s.matches(device_id, sensor_name))
            .cloned()
    }

    /// Adds a sensor. The caller checks with [`find`](Self::find) first.
    pub fn insert(&self, sensor: Sensor) {
        self.sensors().push(sensor);
    }

    pub fn remove(&self, device_id: &str, sensor_name: &str) -> Option<Sensor> {
        let mut sensors = self.sensors();
        let idx = sensors
            .iter()
            .position(|s| s.matches(device_id, sensor_name))?;
        Some(sensors.remove(idx))
    }

    /// Snapshot in insertion order.
    pub fn all(&self) -> Vec<Sensor> {
        self.sensors().clone()
    }

    /// Applies a reading to the stored sensor.
    ///
    /// Returns the updated snapshot and whether the value changed, or `None`
    /// if the sensor is unknown.
    pub fn update(
        &self,
        device_id: &str,
        sensor_name: &str,
        sensor_value: &str,
        now: DateTime<Local>,
    ) -> Option<(Sensor, bool)> {
        let mut sensors = self.sensors();
        let sensor = sensors
            .iter_mut()
            .find(|s| s.matches(device_id, sensor_name))?;
        let changed = sensor.update(sensor_value, now);
        Some((sensor.clone(), changed))
    }

    /// Sets `last_updated` on the stored sensor. Returns false if unknown.
    pub fn touch(&self, device_id: &str, sensor_name: &str, now: DateTime<Local>) -> bool {
        match self
            .sensors()
            .iter_mut()
            .find(|s| s.matches(device_id, sensor_name))
        {
            Some(sensor) => {
                sensor.touch(now);
                true
            }
            None => false,
        }
    }

    /// Removes every sensor silent for longer than `timeout` and returns them.
    ///
    /// `on_evict` runs for each stale sensor before it is removed, with the
    /// lock held. A reading for the same sensor waits until the sweep is done,
    /// finds the sensor gone and rediscovers it, so anything `on_evict` sends
    /// always precedes the rediscovery.
    pub fn evict_stale<F>(
        &self,
        now: DateTime<Local>,
        timeout: TimeDelta,
        mut on_evict: F,
    ) -> Vec<Sensor>
    where
        F: FnMut(&Sensor),
    {
        let mut sensors = self.sensors();
        let mut evicted = Vec::new();
        let mut idx = 0;
        while idx < sensors.len() {
            if sensors[idx].is_stale(now, timeout) {
                on_evict(&sensors[idx]);
                evicted.push(sensors.remove(idx));
            } else {
                idx += 1;
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sensors().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::sensor_type::tests::plain_type;
    use std::sync::Arc;

    fn sensor(device_id: &str, sensor_name: &str) -> Sensor {
        Sensor::new(
            device_id,
            sensor_name,
            "0",
            Arc::new(plain_type("Temp", "devices/temp")),
        )
    }

    #[test]
    fn test_find_insert_remove() {
        let registry = SensorRegistry::new();
        assert!(registry.find("Dev", "Temp").is_none());

        registry.insert(sensor("Dev", "Temp"));
        registry.insert(sensor("Dev", "Humidity"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("Dev", "Temp").unwrap().sensor_name, "Temp");

        assert!(registry.remove("Dev", "Temp").is_some());
        assert!(registry.remove("Dev", "Temp").is_none());
        assert!(registry.find("Dev", "Temp").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_all_keeps_insertion_order() {
        let registry = SensorRegistry::new();
        registry.insert(sensor("B", "x"));
        registry.insert(sensor("A", "y"));
        registry.insert(sensor("C", "z"));

        let names: Vec<_> = registry.all().into_iter().map(|s| s.device_id).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_update_mutates_stored_sensor() {
        let registry = SensorRegistry::new();
        registry.insert(sensor("Dev", "Temp"));
        let now = Local::now();

        let (updated, changed) = registry.update("Dev", "Temp", "5", now).unwrap();
        assert!(changed);
        assert_eq!(updated.sensor_value, "5");
        assert_eq!(registry.find("Dev", "Temp").unwrap().sensor_value, "5");

        let (_, changed) = registry.update("Dev", "Temp", "5", now).unwrap();
        assert!(!changed);
        assert!(registry.update("Dev", "Missing", "5", now).is_none());
    }

    #[test]
    fn test_evict_stale_only_removes_expired() {
        let registry = SensorRegistry::new();
        let now = Local::now();
        let timeout = TimeDelta::seconds(60);

        let mut old = sensor("Dev", "Old");
        old.touch(now - TimeDelta::seconds(120));
        let mut fresh = sensor("Dev", "Fresh");
        fresh.touch(now - TimeDelta::seconds(10));
        registry.insert(old);
        registry.insert(fresh);
        registry.insert(sensor("Dev", "Never"));

        let mut seen = Vec::new();
        let evicted = registry.evict_stale(now, timeout, |s| seen.push(s.sensor_name.clone()));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].sensor_name, "Old");
        assert_eq!(seen, vec!["Old"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.find("Dev", "Fresh").is_some());
        assert!(registry.find("Dev", "Never").is_some());
    }

    #[test]
    fn test_concurrent_insert_and_snapshot() {
        let registry = Arc::new(SensorRegistry::new());
        let writer = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    registry.insert(sensor("Dev", &format!("s{i}")));
                }
            })
        };
        for _ in 0..50 {
            let snapshot = registry.all();
            assert!(snapshot.len() <= 200);
        }
        writer.join().unwrap();
        assert_eq!(registry.len(), 200);
    }
}
