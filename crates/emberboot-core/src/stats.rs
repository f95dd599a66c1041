//! Monotonic counters and the status snapshot.

use crate::session::Validation;
use crate::state::State;

/// Lifetime counters; only `reset` clears them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootStats {
    /// Frames dequeued and dispatched.
    pub packets_processed: u32,
    /// Frames rejected at ingress (queue full or malformed).
    pub packets_dropped: u32,
    /// Sequence faults plus Error-state entries.
    pub error_count: u32,
    /// EmergencyRecovery entries.
    pub recovery_attempts: u32,
    /// RunningApp entries.
    pub app_launch_attempts: u32,
}

/// A point-in-time snapshot of the supervisor.
///
/// This is the extended GET_STATUS surface and the data behind
/// `Supervisor::log_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub state: State,
    pub previous_state: State,
    pub force_bootloader_mode: bool,
    pub session_active: bool,
    pub bytes_received: u32,
    pub total_size: u32,
    pub expected_seq: u32,
    pub queue_depth: usize,
    pub stats: BootStats,
    /// Outcome of the most recent verification pass, if any ran.
    pub last_validation: Option<Validation>,
}
