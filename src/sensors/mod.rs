//! Sensor domain model
//!
//! ```text
//! sensors/
//! ├── sensor_type.rs  - Static type catalog and entity-kind classification
//! ├── sensor.rs       - One (device, sensor) record with derived identifiers
//! └── registry.rs     - Lock-guarded table of live sensors
//! ```
//!
//! Sensor types are configuration, loaded once and shared through `Arc`.
//! Sensors are created from the first reading of an unseen pair and live in
//! the [`SensorRegistry`] until the liveness sweep evicts them.

pub mod registry;
pub mod sensor;
pub mod sensor_type;

pub use registry::SensorRegistry;
pub use sensor::{flatten_name, Sensor};
pub use sensor_type::{EntityKind, SensorType, SensorTypeCatalog};
