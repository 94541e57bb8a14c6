//! Bridge between device readings and the Home Assistant hub
//!
//! ```text
//! bridge/
//! ├── controller.rs      - Message dispatch and connection callbacks
//! ├── command_router.rs  - Hub command topic ──► device command topic
//! └── liveness.rs        - Periodic offline sweep
//! ```

pub mod command_router;
pub mod controller;
pub mod liveness;

pub use command_router::CommandRouter;
pub use controller::{BridgeController, Dispatch};
pub use liveness::LivenessSweeper;
