//! Framed packet view and the START_SESSION payload.
//!
//! The transport delivers whole frames; byte 0 is the sequence number,
//! byte 1 the command type, and everything after is the type-specific
//! payload. Packets are plain value types so the receive queue can hold
//! them in fixed slots without allocation.

use core::fmt;

use crate::constants::{
    MAX_IMAGE_SIZE, MAX_PACKET_SIZE, MIN_PACKET_SIZE, PACKET_HEADER_SIZE, SESSION_REQUEST_SIZE,
};
use crate::error::WireError;
use crate::PacketType;

/// A received frame: fixed storage plus the used length.
///
/// Never mutated after construction; the queue copies it into a slot and
/// the supervisor reads it back out.
#[derive(Clone, Copy)]
pub struct Packet {
    data: [u8; MAX_PACKET_SIZE],
    len: usize,
}

impl Packet {
    /// An invalid placeholder used to initialise queue slots.
    pub const EMPTY: Packet = Packet {
        data: [0; MAX_PACKET_SIZE],
        len: 0,
    };

    /// Copy a delivered frame into an owned packet.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < MIN_PACKET_SIZE {
            return Err(WireError::TooShort {
                actual: bytes.len(),
                min: MIN_PACKET_SIZE,
            });
        }
        if bytes.len() > MAX_PACKET_SIZE {
            return Err(WireError::TooLong {
                actual: bytes.len(),
                max: MAX_PACKET_SIZE,
            });
        }

        let mut data = [0u8; MAX_PACKET_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            data,
            len: bytes.len(),
        })
    }

    /// The sequence byte (byte 0).
    pub fn sequence(&self) -> u8 {
        self.data[0]
    }

    /// The raw command type byte (byte 1).
    pub fn type_code(&self) -> u8 {
        self.data[1]
    }

    /// The decoded command type.
    pub fn packet_type(&self) -> Result<PacketType, WireError> {
        PacketType::from_u8(self.type_code())
    }

    /// The type-specific payload (bytes 2..len).
    pub fn payload(&self) -> &[u8] {
        &self.data[PACKET_HEADER_SIZE..self.len]
    }

    /// Total frame length including the two header bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("seq", &self.sequence())
            .field("type", &format_args!("0x{:02X}", self.type_code()))
            .field("len", &self.len)
            .finish()
    }
}

/// Parsed START_SESSION payload.
///
/// Layout: `total_size(4, BE) || expected_crc(2, BE)` at bytes 2..8 of the
/// frame. The 2-byte legacy form without a CRC is rejected as too short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRequest {
    /// Declared image size in bytes, `1..=MAX_IMAGE_SIZE`.
    pub total_size: u32,
    /// CRC the finished image must fingerprint to.
    pub expected_crc: u16,
}

impl SessionRequest {
    pub fn parse(packet: &Packet) -> Result<Self, WireError> {
        let payload = packet.payload();
        if payload.len() < SESSION_REQUEST_SIZE {
            return Err(WireError::TooShort {
                actual: payload.len(),
                min: SESSION_REQUEST_SIZE,
            });
        }

        let total_size =
            u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let expected_crc = u16::from_be_bytes([payload[4], payload[5]]);

        if total_size == 0 || total_size > MAX_IMAGE_SIZE {
            return Err(WireError::SizeOutOfRange(total_size));
        }

        Ok(Self {
            total_size,
            expected_crc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_minimum_frame() {
        let pkt = Packet::from_bytes(&[0x07, 0x05]).unwrap();
        assert_eq!(pkt.sequence(), 0x07);
        assert_eq!(pkt.type_code(), 0x05);
        assert_eq!(pkt.packet_type().unwrap(), PacketType::Ping);
        assert!(pkt.payload().is_empty());
        assert_eq!(pkt.len(), 2);
    }

    #[test]
    fn from_bytes_one_byte_rejected() {
        let err = Packet::from_bytes(&[0x00]).unwrap_err();
        assert_eq!(err, WireError::TooShort { actual: 1, min: 2 });
    }

    #[test]
    fn from_bytes_empty_rejected() {
        assert!(Packet::from_bytes(&[]).is_err());
    }

    #[test]
    fn from_bytes_max_frame_accepted() {
        let bytes = [0xAB; MAX_PACKET_SIZE];
        let pkt = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(pkt.len(), MAX_PACKET_SIZE);
        assert_eq!(pkt.payload().len(), MAX_PACKET_SIZE - 2);
    }

    #[test]
    fn from_bytes_oversize_rejected() {
        let bytes = [0u8; MAX_PACKET_SIZE + 1];
        let err = Packet::from_bytes(&bytes).unwrap_err();
        assert_eq!(
            err,
            WireError::TooLong {
                actual: MAX_PACKET_SIZE + 1,
                max: MAX_PACKET_SIZE
            }
        );
    }

    #[test]
    fn payload_slice_offsets() {
        let pkt = Packet::from_bytes(&[0x01, 0x02, 0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(pkt.payload(), &[0xAA, 0xBB, 0xCC]);
    }

    fn start_frame(total_size: u32, crc: u16) -> Vec<u8> {
        let mut frame = vec![0x00, 0x01];
        frame.extend_from_slice(&total_size.to_be_bytes());
        frame.extend_from_slice(&crc.to_be_bytes());
        frame
    }

    #[test]
    fn session_request_parse() {
        let pkt = Packet::from_bytes(&start_frame(512, 0x1234)).unwrap();
        let req = SessionRequest::parse(&pkt).unwrap();
        assert_eq!(req.total_size, 512);
        assert_eq!(req.expected_crc, 0x1234);
    }

    #[test]
    fn session_request_big_endian_layout() {
        // 0x00030201 = 197_121 bytes, CRC 0xBEEF
        let pkt =
            Packet::from_bytes(&[0x00, 0x01, 0x00, 0x03, 0x02, 0x01, 0xBE, 0xEF]).unwrap();
        let req = SessionRequest::parse(&pkt).unwrap();
        assert_eq!(req.total_size, 0x0003_0201);
        assert_eq!(req.expected_crc, 0xBEEF);
    }

    #[test]
    fn session_request_legacy_short_form_rejected() {
        // Old 2-byte size-only form: not enough payload.
        let pkt = Packet::from_bytes(&[0x00, 0x01, 0x02, 0x00]).unwrap();
        let err = SessionRequest::parse(&pkt).unwrap_err();
        assert_eq!(err, WireError::TooShort { actual: 2, min: 6 });
    }

    #[test]
    fn session_request_zero_size_rejected() {
        let pkt = Packet::from_bytes(&start_frame(0, 0x1234)).unwrap();
        assert_eq!(
            SessionRequest::parse(&pkt).unwrap_err(),
            WireError::SizeOutOfRange(0)
        );
    }

    #[test]
    fn session_request_max_size_accepted() {
        let pkt = Packet::from_bytes(&start_frame(MAX_IMAGE_SIZE, 0)).unwrap();
        assert_eq!(
            SessionRequest::parse(&pkt).unwrap().total_size,
            MAX_IMAGE_SIZE
        );
    }

    #[test]
    fn session_request_oversize_rejected() {
        let pkt = Packet::from_bytes(&start_frame(MAX_IMAGE_SIZE + 1, 0)).unwrap();
        assert_eq!(
            SessionRequest::parse(&pkt).unwrap_err(),
            WireError::SizeOutOfRange(MAX_IMAGE_SIZE + 1)
        );
    }

    #[test]
    fn session_request_trailing_bytes_ignored() {
        let mut frame = start_frame(1024, 0xCAFE);
        frame.extend_from_slice(&[0xDE, 0xAD]);
        let pkt = Packet::from_bytes(&frame).unwrap();
        let req = SessionRequest::parse(&pkt).unwrap();
        assert_eq!(req.total_size, 1024);
        assert_eq!(req.expected_crc, 0xCAFE);
    }
}
