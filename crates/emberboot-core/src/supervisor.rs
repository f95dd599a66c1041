//! The supervisor: dequeues packets, drives the state machine, and owns
//! every timeout.
//!
//! One `process_cycle` call performs, in order: the pending-quarantine
//! latch, timeout checks, the flash completion poll, state background work,
//! and a full drain of the receive queue. Every step returns promptly; the
//! only long-latency device (flash) is polled, never awaited, so the
//! transport can keep enqueueing while writes are in flight.

use emberboot_wire::constants::APPLICATION_START;
use emberboot_wire::{NackCode, Packet};

use crate::dispatch::{self, DispatchPlan, Reply};
use crate::platform::Platform;
use crate::queue::PacketQueue;
use crate::session::{Session, Validation};
use crate::state::{transition_admissible, State};
use crate::stats::{BootStats, StatusReport};
use crate::timeouts::{window_elapsed, SupervisorConfig};

/// Drops beyond this count escalate to quarantine.
const DROP_ESCALATION_LIMIT: u32 = 10;
/// Sequence faults beyond this count escalate to quarantine.
const SEQUENCE_ESCALATION_LIMIT: u32 = 5;

/// The bootloader core. One instance per device; all mutation flows
/// through `&mut self` from the supervisor's thread of control.
pub struct Supervisor<P: Platform> {
    platform: P,
    config: SupervisorConfig,

    state: State,
    previous_state: State,
    state_entry_time: u64,
    last_activity_time: u64,

    force_bootloader_mode: bool,
    emergency_pending: bool,

    queue: PacketQueue,
    session: Session,
    stats: BootStats,
    last_validation: Option<Validation>,
}

impl<P: Platform> Supervisor<P> {
    /// Construct a core in Idle with all counters cleared.
    pub fn new(platform: P, config: SupervisorConfig) -> Self {
        let mut supervisor = Self {
            platform,
            config,
            state: State::Idle,
            previous_state: State::Idle,
            state_entry_time: 0,
            last_activity_time: 0,
            force_bootloader_mode: false,
            emergency_pending: false,
            queue: PacketQueue::new(),
            session: Session::new(),
            stats: BootStats::default(),
            last_validation: None,
        };
        supervisor.reset();
        supervisor
    }

    /// Reinitialise: zero-clear all state and re-enter Idle.
    ///
    /// This is the only operation that clears `force_bootloader_mode`.
    /// Idempotent: a second call observes the same state as the first.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.previous_state = State::Idle;
        self.force_bootloader_mode = false;
        self.emergency_pending = false;
        self.queue = PacketQueue::new();
        self.session = Session::new();
        self.stats = BootStats::default();
        self.last_validation = None;

        let now = self.platform.tick_micros();
        self.state_entry_time = now;
        self.last_activity_time = now;

        tracing::info!("bootloader core initialised");
    }

    // ------------------------------------------------------------------ //
    // Ingress
    // ------------------------------------------------------------------ //

    /// Buffer one delivered frame. Returns `false` when the frame was
    /// dropped (malformed or queue full); the peer retransmits on loss.
    pub fn receive_packet(&mut self, bytes: &[u8]) -> bool {
        let packet = match Packet::from_bytes(bytes) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!(%error, "malformed frame dropped");
                self.count_drop();
                return false;
            }
        };

        if !self.queue.enqueue(packet) {
            tracing::debug!(queued = self.queue.len(), "queue full, frame dropped");
            self.count_drop();
            return false;
        }

        self.last_activity_time = self.platform.tick_micros();
        tracing::trace!(len = bytes.len(), queued = self.queue.len(), "frame buffered");
        true
    }

    fn count_drop(&mut self) {
        self.stats.packets_dropped += 1;
        if self.stats.packets_dropped > DROP_ESCALATION_LIMIT
            && self.state != State::EmergencyRecovery
        {
            if !self.emergency_pending {
                tracing::warn!(
                    dropped = self.stats.packets_dropped,
                    "excessive drops, quarantine scheduled"
                );
            }
            // Applied at the top of the next cycle so the ingress path
            // never mutates supervisor state from a callback context.
            self.emergency_pending = true;
        }
    }

    // ------------------------------------------------------------------ //
    // The cycle
    // ------------------------------------------------------------------ //

    /// Advance the core by one non-blocking step.
    pub fn process_cycle(&mut self) {
        if self.emergency_pending {
            self.emergency_pending = false;
            self.trigger_emergency();
        }

        self.check_timeouts();
        self.platform.is_flash_operation_complete();
        self.run_state_work();
        self.drain_queue();
    }

    fn check_timeouts(&mut self) {
        let now = self.platform.tick_micros();

        // Session inactivity. Skipped in Error: the session is already
        // failed there and re-entering Error would restart the heal window.
        if self.session.active
            && self.state != State::Error
            && window_elapsed(now, self.last_activity_time, self.config.session_timeout_us)
        {
            tracing::warn!("session inactivity timeout");
            self.enter_state(State::Error);
        }

        match self.state {
            State::DfuVerify
                if window_elapsed(now, self.state_entry_time, self.config.validation_timeout_us) =>
            {
                tracing::warn!("verification timeout");
                self.enter_state(State::Error);
            }
            State::Error
                if window_elapsed(now, self.state_entry_time, self.config.error_heal_us) =>
            {
                tracing::info!("error window elapsed, returning to idle");
                self.enter_state(State::Idle);
            }
            _ => {}
        }
    }

    fn run_state_work(&mut self) {
        match self.state {
            State::DfuVerify => {
                let validation = self.session.validate();
                self.last_validation = Some(validation);
                if validation.valid {
                    tracing::info!(
                        size = validation.size,
                        crc = validation.calculated_crc,
                        "image verified"
                    );
                    self.enter_state(State::RunningApp);
                } else {
                    tracing::warn!(
                        calculated = validation.calculated_crc,
                        expected = validation.expected_crc,
                        "image verification failed"
                    );
                    self.enter_state(State::Error);
                }
            }
            State::RunningApp => {
                // Hand-off point: a deployment jumps to APPLICATION_START
                // here and never returns.
                tracing::debug!("application hand-off complete");
                self.enter_state(State::Idle);
            }
            State::EmergencyRecovery => {
                let now = self.platform.tick_micros();
                if window_elapsed(now, self.state_entry_time, self.config.recovery_heal_us) {
                    self.stats.packets_dropped = 0;
                    self.stats.error_count = 0;
                    tracing::info!("recovery window elapsed, returning to idle");
                    self.enter_state(State::Idle);
                }
            }
            _ => {}
        }
    }

    fn drain_queue(&mut self) {
        while let Some(packet) = self.queue.dequeue() {
            self.stats.packets_processed += 1;
            tracing::trace!(
                seq = packet.sequence(),
                ty = packet.type_code(),
                state = self.state.name(),
                "dispatching packet"
            );

            // Each packet observes the state at its own dispatch.
            let plan = dispatch::plan(self.state, &packet, &self.session, self.force_bootloader_mode);
            self.apply(plan, &packet);
        }
    }

    // ------------------------------------------------------------------ //
    // Plan application
    // ------------------------------------------------------------------ //

    fn apply(&mut self, plan: DispatchPlan, packet: &Packet) {
        match plan {
            DispatchPlan::Reply(reply) => self.send_reply(reply),
            DispatchPlan::Ignore => {}
            DispatchPlan::ReportStatus => {
                let report = self.status();
                tracing::debug!(?report, "status requested");
                self.platform.send_ack();
            }
            DispatchPlan::StartSession(request) => {
                self.session.begin(request);
                self.enter_state(State::DfuActive);
                self.platform.send_ack();
                tracing::info!(
                    total_size = request.total_size,
                    expected_crc = request.expected_crc,
                    "session started"
                );
            }
            DispatchPlan::WriteData => self.write_data(packet),
            DispatchPlan::SequenceFault => {
                tracing::warn!(
                    got = packet.sequence(),
                    expected = self.session.expected_seq,
                    "sequence fault"
                );
                self.platform.send_nack(NackCode::SequenceError);
                self.stats.error_count += 1;
                if self.stats.error_count > SEQUENCE_ESCALATION_LIMIT {
                    self.trigger_emergency();
                }
            }
            DispatchPlan::FinishSession => {
                tracing::info!(bytes = self.session.bytes_received, "transfer complete");
                self.enter_state(State::DfuVerify);
                self.platform.send_ack();
            }
            DispatchPlan::AbandonSession => {
                tracing::warn!(
                    received = self.session.bytes_received,
                    declared = self.session.total_size,
                    "incomplete transfer"
                );
                self.platform.send_nack(NackCode::IncompleteTransfer);
                self.enter_state(State::Error);
            }
            DispatchPlan::AbortSession => {
                tracing::info!("session aborted by peer");
                self.enter_state(State::Idle);
                self.platform.send_ack();
            }
            DispatchPlan::Launch => {
                tracing::info!("application launch requested");
                self.enter_state(State::DfuVerify);
                self.platform.send_ack();
            }
            DispatchPlan::Emergency => self.trigger_emergency(),
        }
    }

    fn send_reply(&mut self, reply: Reply) {
        match reply {
            Reply::Ack => self.platform.send_ack(),
            Reply::Nack(code) => self.platform.send_nack(code),
        }
    }

    fn write_data(&mut self, packet: &Packet) {
        let payload = packet.payload();
        let address = APPLICATION_START + self.session.bytes_received;

        if self.platform.start_flash_write(address, payload) {
            self.session.accept_payload(payload);
            self.platform.send_ack();
            tracing::debug!(
                seq = packet.sequence(),
                len = payload.len(),
                received = self.session.bytes_received,
                total = self.session.total_size,
                "payload accepted"
            );
        } else {
            tracing::debug!(seq = packet.sequence(), "flash busy");
            self.platform.send_nack(NackCode::FlashBusy);
        }
    }

    // ------------------------------------------------------------------ //
    // Transitions
    // ------------------------------------------------------------------ //

    fn enter_state(&mut self, to: State) {
        if !transition_admissible(self.state, to) {
            tracing::error!(
                from = self.state.name(),
                to = to.name(),
                "inadmissible transition"
            );
            // The machine fails toward Error from the originating state;
            // Error-from-Error is absorbed rather than recursed.
            self.force_enter(State::Error);
            return;
        }
        self.force_enter(to);
    }

    fn force_enter(&mut self, to: State) {
        self.previous_state = self.state;
        self.state = to;
        self.state_entry_time = self.platform.tick_micros();

        match to {
            State::Idle => {
                self.session.clear();
                tracing::info!("entered IDLE");
            }
            State::DfuActive => tracing::debug!("entered DFU_ACTIVE"),
            State::DfuVerify => tracing::debug!("entered DFU_VERIFY"),
            State::RunningApp => {
                self.stats.app_launch_attempts += 1;
                tracing::info!(
                    attempts = self.stats.app_launch_attempts,
                    "entered RUNNING_APP"
                );
            }
            State::EmergencyRecovery => {
                self.stats.recovery_attempts += 1;
                self.force_bootloader_mode = true;
                tracing::warn!(
                    attempts = self.stats.recovery_attempts,
                    "entered EMERGENCY_RECOVERY"
                );
            }
            State::Error => {
                self.stats.error_count += 1;
                tracing::warn!(previous = self.previous_state.name(), "entered ERROR");
            }
        }
    }

    fn trigger_emergency(&mut self) {
        if self.state == State::EmergencyRecovery {
            // Another reset during quarantine restarts the window.
            self.state_entry_time = self.platform.tick_micros();
            tracing::warn!("quarantine window restarted");
            return;
        }
        tracing::warn!("emergency condition");
        self.enter_state(State::EmergencyRecovery);
    }

    // ------------------------------------------------------------------ //
    // Observability
    // ------------------------------------------------------------------ //

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> BootStats {
        self.stats
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn force_bootloader_mode(&self) -> bool {
        self.force_bootloader_mode
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Point-in-time snapshot of the whole core.
    pub fn status(&self) -> StatusReport {
        StatusReport {
            state: self.state,
            previous_state: self.previous_state,
            force_bootloader_mode: self.force_bootloader_mode,
            session_active: self.session.active,
            bytes_received: self.session.bytes_received,
            total_size: self.session.total_size,
            expected_seq: self.session.expected_seq,
            queue_depth: self.queue.len(),
            stats: self.stats,
            last_validation: self.last_validation,
        }
    }

    /// Emit the status snapshot through the log.
    pub fn log_stats(&self) {
        let report = self.status();
        tracing::info!(
            state = report.state.name(),
            previous = report.previous_state.name(),
            session_active = report.session_active,
            forced = report.force_bootloader_mode,
            processed = report.stats.packets_processed,
            dropped = report.stats.packets_dropped,
            queued = report.queue_depth,
            received = report.bytes_received,
            total = report.total_size,
            expected_seq = report.expected_seq,
            errors = report.stats.error_count,
            recoveries = report.stats.recovery_attempts,
            launches = report.stats.app_launch_attempts,
            "bootloader statistics"
        );
        if let Some(validation) = report.last_validation {
            tracing::info!(
                valid = validation.valid,
                size = validation.size,
                calculated_crc = validation.calculated_crc,
                expected_crc = validation.expected_crc,
                "last validation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ScriptedPlatform;

    fn supervisor() -> Supervisor<ScriptedPlatform> {
        Supervisor::new(ScriptedPlatform::new(), SupervisorConfig::default())
    }

    fn start_frame(total_size: u32, crc: u16) -> Vec<u8> {
        let mut frame = vec![0x00, 0x01];
        frame.extend_from_slice(&total_size.to_be_bytes());
        frame.extend_from_slice(&crc.to_be_bytes());
        frame
    }

    #[test]
    fn starts_in_idle() {
        let sup = supervisor();
        assert_eq!(sup.state(), State::Idle);
        assert!(!sup.force_bootloader_mode());
        assert_eq!(sup.stats(), BootStats::default());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut sup = supervisor();
        sup.receive_packet(&start_frame(512, 0x1234));
        sup.process_cycle();
        assert_eq!(sup.state(), State::DfuActive);

        sup.reset();
        let first = sup.status();
        sup.reset();
        assert_eq!(sup.status(), first);
        assert_eq!(sup.state(), State::Idle);
    }

    #[test]
    fn reset_clears_forced_mode() {
        let mut sup = supervisor();
        sup.receive_packet(&[0x00, 0x08]);
        sup.process_cycle();
        assert!(sup.force_bootloader_mode());

        sup.reset();
        assert!(!sup.force_bootloader_mode());
        assert_eq!(sup.state(), State::Idle);
    }

    #[test]
    fn malformed_frame_counts_as_drop() {
        let mut sup = supervisor();
        assert!(!sup.receive_packet(&[0x01]));
        assert!(!sup.receive_packet(&[]));
        assert_eq!(sup.stats().packets_dropped, 2);
        assert_eq!(sup.stats().packets_processed, 0);
    }

    #[test]
    fn emergency_reset_restarts_quarantine_window() {
        let mut sup = supervisor();
        sup.receive_packet(&[0x00, 0x08]);
        sup.process_cycle();
        assert_eq!(sup.state(), State::EmergencyRecovery);
        assert_eq!(sup.stats().recovery_attempts, 1);

        // 6 s in, another reset restarts the 10 s window.
        sup.platform_mut().advance(6_000_000);
        sup.receive_packet(&[0x01, 0x08]);
        sup.process_cycle();
        assert_eq!(sup.state(), State::EmergencyRecovery);
        assert_eq!(sup.stats().recovery_attempts, 1);

        // 6 s later the first window would have elapsed; the restarted
        // one has not.
        sup.platform_mut().advance(6_000_000);
        sup.process_cycle();
        assert_eq!(sup.state(), State::EmergencyRecovery);

        sup.platform_mut().advance(5_000_000);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Idle);
    }

    #[test]
    fn session_inactivity_times_out_to_error() {
        let mut sup = supervisor();
        sup.receive_packet(&start_frame(512, 0x1234));
        sup.process_cycle();
        assert_eq!(sup.state(), State::DfuActive);

        sup.platform_mut().advance(30_000_001);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Error);
    }

    #[test]
    fn error_state_heals_once() {
        let mut sup = supervisor();
        sup.receive_packet(&start_frame(512, 0x1234));
        sup.process_cycle();
        sup.platform_mut().advance(30_000_001);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Error);
        let errors_at_entry = sup.stats().error_count;

        // Dwelling in Error must not re-trip the session timeout.
        sup.platform_mut().advance(1_000_000);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Error);
        assert_eq!(sup.stats().error_count, errors_at_entry);

        sup.platform_mut().advance(4_000_001);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Idle);
        assert!(!sup.session().active);
    }

    #[test]
    fn abort_returns_to_idle_with_ack() {
        let mut sup = supervisor();
        sup.receive_packet(&start_frame(512, 0x1234));
        sup.process_cycle();
        sup.platform_mut().take_replies();

        sup.receive_packet(&[0x05, 0x04]);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Idle);
        assert_eq!(sup.platform_mut().take_replies(), vec![Reply::Ack]);
        assert!(!sup.session().active);
    }

    #[test]
    fn abort_outside_transfer_is_silent() {
        let mut sup = supervisor();
        sup.receive_packet(&[0x05, 0x04]);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Idle);
        assert!(sup.platform_mut().take_replies().is_empty());
        assert_eq!(sup.stats().packets_processed, 1);
    }

    #[test]
    fn get_status_acks_and_snapshot_matches() {
        let mut sup = supervisor();
        sup.receive_packet(&[0x00, 0x06]);
        sup.process_cycle();
        assert_eq!(sup.platform_mut().take_replies(), vec![Reply::Ack]);

        let report = sup.status();
        assert_eq!(report.state, State::Idle);
        assert_eq!(report.queue_depth, 0);
        assert_eq!(report.stats.packets_processed, 1);
    }

    #[test]
    fn jump_app_without_valid_image_fails_verification() {
        let mut sup = supervisor();
        sup.receive_packet(&[0x00, 0x07]);
        sup.process_cycle();
        assert_eq!(sup.state(), State::DfuVerify);
        assert_eq!(sup.platform_mut().take_replies(), vec![Reply::Ack]);

        // Nothing was ever flashed: the fingerprint cannot match.
        sup.process_cycle();
        assert_eq!(sup.state(), State::Error);
        let report = sup.status();
        assert!(!report.last_validation.unwrap().valid);
    }

    #[test]
    fn jump_app_blocked_in_forced_mode() {
        let mut sup = supervisor();
        sup.receive_packet(&[0x00, 0x08]);
        sup.process_cycle();
        sup.platform_mut().advance(10_000_001);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Idle);
        assert!(sup.force_bootloader_mode());

        sup.receive_packet(&[0x01, 0x07]);
        sup.process_cycle();
        assert_eq!(sup.state(), State::Idle);
        assert_eq!(
            sup.platform_mut().take_replies(),
            vec![Reply::Nack(NackCode::BootloaderForced)]
        );
    }

    #[test]
    fn data_overflowing_declared_size_rejected_without_progress() {
        let mut sup = supervisor();
        sup.receive_packet(&start_frame(4, 0x0000));
        sup.process_cycle();
        sup.platform_mut().take_replies();

        let mut data = vec![0x01, 0x02];
        data.extend_from_slice(&[0xAA; 6]);
        sup.receive_packet(&data);
        sup.process_cycle();

        assert_eq!(
            sup.platform_mut().take_replies(),
            vec![Reply::Nack(NackCode::InvalidSessionSize)]
        );
        assert_eq!(sup.session().bytes_received, 0);
        assert_eq!(sup.session().expected_seq, 1);
        assert_eq!(sup.state(), State::DfuActive);
    }
}
