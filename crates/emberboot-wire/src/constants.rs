//! Wire constants and command enumerations for the DFU protocol.

use crate::error::WireError;

// Packet geometry
pub const MAX_PACKET_SIZE: usize = 256;
pub const MIN_PACKET_SIZE: usize = 2;
pub const PACKET_HEADER_SIZE: usize = 2;

// START_SESSION payload: total_size(4, BE) || expected_crc(2, BE)
pub const SESSION_REQUEST_SIZE: usize = 6;

// Flash layout
pub const APPLICATION_START: u32 = 0x0800_8000;
pub const MAX_IMAGE_SIZE: u32 = 1024 * 1024;

/// Command type carried in byte 1 of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    StartSession = 0x01,
    Data = 0x02,
    EndSession = 0x03,
    Abort = 0x04,
    Ping = 0x05,
    GetStatus = 0x06,
    JumpApp = 0x07,
    EmergencyReset = 0x08,
    GetVersion = 0x09,
}

impl PacketType {
    pub fn from_u8(v: u8) -> Result<Self, WireError> {
        match v {
            0x01 => Ok(PacketType::StartSession),
            0x02 => Ok(PacketType::Data),
            0x03 => Ok(PacketType::EndSession),
            0x04 => Ok(PacketType::Abort),
            0x05 => Ok(PacketType::Ping),
            0x06 => Ok(PacketType::GetStatus),
            0x07 => Ok(PacketType::JumpApp),
            0x08 => Ok(PacketType::EmergencyReset),
            0x09 => Ok(PacketType::GetVersion),
            _ => Err(WireError::UnknownType(v)),
        }
    }
}

/// Error byte carried in a NACK reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NackCode {
    /// Packet not valid in the current state.
    InvalidPacket = 0x01,
    /// DATA sequence number did not match the expected one.
    SequenceError = 0x02,
    /// A flash operation is still in flight.
    FlashBusy = 0x03,
    /// Type not accepted while a transfer is active.
    InvalidDfuType = 0x04,
    /// Declared session size outside 1..=MAX_IMAGE_SIZE.
    InvalidSessionSize = 0x05,
    /// END_SESSION before all declared bytes arrived.
    IncompleteTransfer = 0x08,
    /// Only diagnostic commands are accepted during recovery.
    RecoveryOnly = 0x10,
    /// No handler for this packet in the current state.
    InvalidState = 0x11,
    /// Session start and app launch are disabled by the recovery latch.
    BootloaderForced = 0x12,
    /// Fallback code for packets no state routes.
    Unknown = 0xFF,
}

impl NackCode {
    /// The raw error byte placed in the NACK frame.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
