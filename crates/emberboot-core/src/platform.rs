//! The platform capability consumed by the supervisor.
//!
//! Everything the core needs from the outside world goes through one small
//! trait: the flash driver, the acknowledgement wire, and the monotonic
//! tick. Deployments implement it against real peripherals; tests use
//! [`ScriptedPlatform`] with a manually advanced clock.

use emberboot_wire::NackCode;

use crate::dispatch::Reply;

/// Capabilities the supervisor imports from its collaborators.
pub trait Platform {
    /// Begin an asynchronous flash write of `bytes` at `address`.
    ///
    /// Non-blocking: returns `false` when an operation is already in
    /// flight. The driver may only borrow `bytes` for the duration of the
    /// call; the caller reuses the source memory immediately after.
    fn start_flash_write(&mut self, address: u32, bytes: &[u8]) -> bool;

    /// Idempotent completion poll; moves the driver from busy to idle once
    /// its operation has finished. Completion carries no payload.
    fn is_flash_operation_complete(&mut self) -> bool;

    /// Emit a positive acknowledgement frame.
    fn send_ack(&mut self);

    /// Emit a negative acknowledgement frame with one error byte.
    fn send_nack(&mut self, code: NackCode);

    /// Monotonic microsecond counter.
    fn tick_micros(&mut self) -> u64;
}

/// Deterministic in-memory platform for tests.
///
/// The clock only moves through [`ScriptedPlatform::advance`], flash writes
/// become busy for a configurable window of that clock, and every emitted
/// reply and accepted write is recorded for inspection.
#[derive(Debug)]
pub struct ScriptedPlatform {
    now_us: u64,
    flash_busy_until: Option<u64>,
    /// Simulated write duration. Defaults to 2 ms.
    pub flash_latency_us: u64,
    /// Every accepted write, in order: (address, bytes).
    pub writes: Vec<(u32, Vec<u8>)>,
    /// Every emitted ACK/NACK, in order.
    pub replies: Vec<Reply>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self {
            now_us: 0,
            flash_busy_until: None,
            flash_latency_us: 2_000,
            writes: Vec::new(),
            replies: Vec::new(),
        }
    }

    /// Move the clock forward.
    pub fn advance(&mut self, micros: u64) {
        self.now_us += micros;
    }

    /// Drain the recorded replies.
    pub fn take_replies(&mut self) -> Vec<Reply> {
        std::mem::take(&mut self.replies)
    }

    /// Concatenation of every accepted write payload, in order.
    pub fn written_image(&self) -> Vec<u8> {
        self.writes
            .iter()
            .flat_map(|(_, bytes)| bytes.iter().copied())
            .collect()
    }
}

impl Default for ScriptedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for ScriptedPlatform {
    fn start_flash_write(&mut self, address: u32, bytes: &[u8]) -> bool {
        if self.flash_busy_until.is_some_and(|until| self.now_us < until) {
            return false;
        }
        self.writes.push((address, bytes.to_vec()));
        self.flash_busy_until = Some(self.now_us + self.flash_latency_us);
        true
    }

    fn is_flash_operation_complete(&mut self) -> bool {
        if self.flash_busy_until.is_some_and(|until| self.now_us >= until) {
            self.flash_busy_until = None;
        }
        self.flash_busy_until.is_none()
    }

    fn send_ack(&mut self) {
        self.replies.push(Reply::Ack);
    }

    fn send_nack(&mut self, code: NackCode) {
        self.replies.push(Reply::Nack(code));
    }

    fn tick_micros(&mut self) -> u64 {
        self.now_us
    }
}
