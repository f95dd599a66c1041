//! Host-side simulation harness for the emberboot core.
//!
//! Provides the collaborators the core treats as external: a mock flash
//! with realistic write latency, a wall-clock tick, and a logged
//! acknowledgement wire, plus TOML configuration and scripted demo
//! scenarios that exercise the full DFU protocol.

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod scenarios;

pub use config::SimConfig;
pub use error::SimError;
pub use platform::SimPlatform;
