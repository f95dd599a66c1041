//! Simulated device platform: mock flash, wall-clock tick, logged wire.
//!
//! Mirrors the behaviour of a typical flash peripheral: a write is accepted
//! only when no operation is in flight and completes after a fixed latency,
//! observed through the idempotent completion poll.

use std::time::Instant;

use emberboot_core::Platform;
use emberboot_wire::constants::APPLICATION_START;
use emberboot_wire::NackCode;

/// Size of the simulated flash bank (matches the maximum image size).
pub const FLASH_SIZE: usize = 1024 * 1024;

/// A deterministic-enough stand-in for the device peripherals.
pub struct SimPlatform {
    started: Instant,
    flash: Vec<u8>,
    flash_busy_until: Option<u64>,
    write_latency_us: u64,
    acks_sent: u64,
    nacks_sent: u64,
}

impl SimPlatform {
    pub fn new(write_latency_us: u64) -> Self {
        Self {
            started: Instant::now(),
            flash: vec![0xFF; FLASH_SIZE],
            flash_busy_until: None,
            write_latency_us,
            acks_sent: 0,
            nacks_sent: 0,
        }
    }

    fn now(&self) -> u64 {
        self.started.elapsed().as_micros() as u64
    }

    /// Read back `len` bytes from the application image area.
    pub fn image_slice(&self, len: usize) -> &[u8] {
        let offset = APPLICATION_START as usize & (FLASH_SIZE - 1);
        &self.flash[offset..offset + len]
    }

    pub fn acks_sent(&self) -> u64 {
        self.acks_sent
    }

    pub fn nacks_sent(&self) -> u64 {
        self.nacks_sent
    }
}

impl Platform for SimPlatform {
    fn start_flash_write(&mut self, address: u32, bytes: &[u8]) -> bool {
        let now = self.now();
        if self.flash_busy_until.is_some_and(|until| now < until) {
            tracing::debug!(address, "flash busy, write refused");
            return false;
        }

        // Mask into the simulated bank, as the peripheral would decode it.
        let offset = address as usize & (FLASH_SIZE - 1);
        let end = (offset + bytes.len()).min(FLASH_SIZE);
        self.flash[offset..end].copy_from_slice(&bytes[..end - offset]);

        self.flash_busy_until = Some(now + self.write_latency_us);
        tracing::debug!(address, len = bytes.len(), "flash write started");
        true
    }

    fn is_flash_operation_complete(&mut self) -> bool {
        let now = self.now();
        if self.flash_busy_until.is_some_and(|until| now >= until) {
            self.flash_busy_until = None;
            tracing::debug!("flash write complete");
        }
        self.flash_busy_until.is_none()
    }

    fn send_ack(&mut self) {
        self.acks_sent += 1;
        tracing::debug!("-> ACK");
    }

    fn send_nack(&mut self, code: NackCode) {
        self.nacks_sent += 1;
        tracing::debug!(code = code.as_u8(), "-> NACK");
    }

    fn tick_micros(&mut self) -> u64 {
        self.now()
    }
}
