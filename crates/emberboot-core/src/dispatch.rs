//! Pure dispatch planning for inbound packets.
//!
//! [`plan`] maps (state, packet, session, recovery latch) to a
//! [`DispatchPlan`] without touching flash, the wire, or the clock, so the
//! whole protocol decision table is testable in isolation. The supervisor
//! applies the plan: it sends the reply, performs the transition, and runs
//! the flash write for [`DispatchPlan::WriteData`].
//!
//! Four commands are global and resolve before state routing: PING and
//! GET_STATUS always acknowledge (they are diagnostics, honoured even in
//! recovery), EMERGENCY_RESET always quarantines, and ABORT tears down an
//! active transfer but is consumed silently elsewhere.

use emberboot_wire::{NackCode, Packet, PacketType, SessionRequest, WireError};

use crate::session::Session;
use crate::state::State;

/// An acknowledgement frame to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Nack(NackCode),
}

/// What the supervisor should do with a dispatched packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPlan {
    /// Emit a reply; no other effect.
    Reply(Reply),
    /// Consume the packet without replying.
    Ignore,
    /// Acknowledge and emit the status report.
    ReportStatus,
    /// Begin a transfer and enter DfuActive.
    StartSession(SessionRequest),
    /// Attempt the flash write for an in-order DATA payload; the busy
    /// NACK is decided by the flash driver at apply time.
    WriteData,
    /// DATA arrived out of order: NACK, count the error, maybe escalate.
    SequenceFault,
    /// All declared bytes arrived: acknowledge and verify.
    FinishSession,
    /// END_SESSION before all bytes arrived: NACK and fail.
    AbandonSession,
    /// Tear down the active transfer and acknowledge.
    AbortSession,
    /// Launch requested: validate before handing off.
    Launch,
    /// Quarantine the device.
    Emergency,
}

/// Decide the outcome of one packet against the current supervisor state.
pub fn plan(state: State, packet: &Packet, session: &Session, force_bootloader: bool) -> DispatchPlan {
    let packet_type = packet.packet_type().ok();

    // Global commands first.
    match packet_type {
        Some(PacketType::Ping) => return DispatchPlan::Reply(Reply::Ack),
        Some(PacketType::GetStatus) => return DispatchPlan::ReportStatus,
        Some(PacketType::EmergencyReset) => return DispatchPlan::Emergency,
        Some(PacketType::Abort) => {
            return if state == State::DfuActive {
                DispatchPlan::AbortSession
            } else {
                DispatchPlan::Ignore
            };
        }
        _ => {}
    }

    match state {
        State::Idle => plan_idle(packet_type, packet, force_bootloader),
        State::DfuActive => plan_dfu_active(packet_type, packet, session),
        State::EmergencyRecovery => DispatchPlan::Reply(Reply::Nack(NackCode::RecoveryOnly)),
        State::DfuVerify | State::RunningApp | State::Error => {
            DispatchPlan::Reply(Reply::Nack(NackCode::InvalidState))
        }
    }
}

fn plan_idle(
    packet_type: Option<PacketType>,
    packet: &Packet,
    force_bootloader: bool,
) -> DispatchPlan {
    match packet_type {
        Some(PacketType::StartSession) => {
            if force_bootloader {
                return DispatchPlan::Reply(Reply::Nack(NackCode::BootloaderForced));
            }
            match SessionRequest::parse(packet) {
                Ok(request) => DispatchPlan::StartSession(request),
                Err(WireError::SizeOutOfRange(_)) => {
                    DispatchPlan::Reply(Reply::Nack(NackCode::InvalidSessionSize))
                }
                Err(_) => DispatchPlan::Reply(Reply::Nack(NackCode::InvalidPacket)),
            }
        }
        Some(PacketType::JumpApp) => {
            if force_bootloader {
                DispatchPlan::Reply(Reply::Nack(NackCode::BootloaderForced))
            } else {
                DispatchPlan::Launch
            }
        }
        _ => DispatchPlan::Reply(Reply::Nack(NackCode::InvalidPacket)),
    }
}

fn plan_dfu_active(
    packet_type: Option<PacketType>,
    packet: &Packet,
    session: &Session,
) -> DispatchPlan {
    match packet_type {
        Some(PacketType::Data) => {
            if !session.matches_sequence(packet.sequence()) {
                DispatchPlan::SequenceFault
            } else if session.would_overflow(packet.payload().len()) {
                DispatchPlan::Reply(Reply::Nack(NackCode::InvalidSessionSize))
            } else {
                DispatchPlan::WriteData
            }
        }
        Some(PacketType::EndSession) => {
            if session.is_complete() {
                DispatchPlan::FinishSession
            } else {
                DispatchPlan::AbandonSession
            }
        }
        _ => DispatchPlan::Reply(Reply::Nack(NackCode::InvalidDfuType)),
    }
}
