//! DFU bootloader core.
//!
//! A non-blocking, packet-driven state machine: frames arrive through a
//! bounded receive queue, a six-state supervisor dispatches them per the
//! current state, flash writes complete asynchronously, and the finished
//! image is fingerprint-checked before the application is launched.
//!
//! The core owns no I/O. Flash, the acknowledgement wire, and the
//! monotonic tick are injected through the [`Platform`] capability, so the
//! whole machine runs deterministically under test.

pub mod dispatch;
pub mod platform;
pub mod queue;
pub mod session;
pub mod state;
pub mod stats;
pub mod supervisor;
pub mod timeouts;

pub use dispatch::{DispatchPlan, Reply};
pub use platform::{Platform, ScriptedPlatform};
pub use queue::{PacketQueue, QUEUE_CAPACITY};
pub use session::{Session, Validation};
pub use state::State;
pub use stats::{BootStats, StatusReport};
pub use supervisor::Supervisor;
pub use timeouts::SupervisorConfig;
