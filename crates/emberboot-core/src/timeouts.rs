//! Timeout configuration and the pure deadline decision.
//!
//! All windows are microseconds against the platform's monotonic tick.
//! Deadlines are cooperative: they fire on the first `process_cycle` after
//! expiry, not at wall-clock precision.

/// Default session-inactivity window: 30 s.
pub const SESSION_TIMEOUT_US: u64 = 30_000_000;
/// Default verification window: 5 s.
pub const VALIDATION_TIMEOUT_US: u64 = 5_000_000;
/// Error state self-heals to idle after 5 s.
pub const ERROR_HEAL_US: u64 = 5_000_000;
/// Emergency recovery self-heals to idle after 10 s.
pub const RECOVERY_HEAL_US: u64 = 10_000_000;

/// Supervisor timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Abort the session when no packet arrives for this long.
    pub session_timeout_us: u64,
    /// Fail verification when DfuVerify lasts longer than this.
    pub validation_timeout_us: u64,
    /// Dwell time in Error before self-healing to Idle.
    pub error_heal_us: u64,
    /// Quarantine length in EmergencyRecovery before self-healing.
    pub recovery_heal_us: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            session_timeout_us: SESSION_TIMEOUT_US,
            validation_timeout_us: VALIDATION_TIMEOUT_US,
            error_heal_us: ERROR_HEAL_US,
            recovery_heal_us: RECOVERY_HEAL_US,
        }
    }
}

/// Whether a window measured from `since` has elapsed at `now`.
///
/// Strict `>`: a deadline exactly at the boundary has not yet fired.
/// Saturating so a tick source that restarts never underflows.
pub fn window_elapsed(now: u64, since: u64, window: u64) -> bool {
    now.saturating_sub(since) > window
}
