//! Per-transfer session bookkeeping.
//!
//! A session spans from an accepted START_SESSION to the next Idle entry.
//! It tracks the declared size, the expected data sequence, the running
//! image fingerprint, and how many bytes have landed in flash.

use emberboot_wire::{ImageDigest, SessionRequest};

/// Transfer state populated on START_SESSION and cleared on Idle entry.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    /// Bytes the peer declared for the whole image.
    pub total_size: u32,
    /// Fingerprint the finished image must match.
    pub expected_crc: u16,
    /// Next accepted DATA sequence. Starts at 1; the 8-bit wire sequence
    /// is compared against this modulo 256.
    pub expected_seq: u32,
    /// Bytes accepted into flash so far.
    pub bytes_received: u32,
    /// Mirrors whether the supervisor is in a session-bearing state.
    pub active: bool,
    /// Running CRC over every accepted payload, in arrival order.
    pub digest: ImageDigest,
}

/// Result of fingerprint-checking the received image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub size: u32,
    pub calculated_crc: u16,
    pub expected_crc: u16,
    pub valid: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            total_size: 0,
            expected_crc: 0,
            expected_seq: 0,
            bytes_received: 0,
            active: false,
            digest: ImageDigest::new(),
        }
    }

    /// Idle-entry action: the session ends, but the declared size and CRC
    /// survive for post-hoc status reporting.
    pub fn clear(&mut self) {
        self.active = false;
        self.expected_seq = 0;
        self.bytes_received = 0;
    }

    /// Begin a transfer from an accepted START_SESSION.
    pub fn begin(&mut self, request: SessionRequest) {
        self.total_size = request.total_size;
        self.expected_crc = request.expected_crc;
        self.expected_seq = 1;
        self.bytes_received = 0;
        self.active = true;
        self.digest.reset();
    }

    /// Whether a wire sequence byte matches the next expected DATA packet.
    pub fn matches_sequence(&self, seq: u8) -> bool {
        seq == (self.expected_seq % 256) as u8
    }

    /// Whether accepting `len` more bytes would exceed the declared size.
    pub fn would_overflow(&self, len: usize) -> bool {
        self.bytes_received as u64 + len as u64 > self.total_size as u64
    }

    /// Record an accepted payload: advance the cursor, the sequence, and
    /// fold the bytes into the fingerprint.
    pub fn accept_payload(&mut self, payload: &[u8]) {
        self.digest.update(payload);
        self.bytes_received += payload.len() as u32;
        self.expected_seq += 1;
    }

    /// Whether every declared byte has arrived.
    pub fn is_complete(&self) -> bool {
        self.bytes_received == self.total_size
    }

    /// Fingerprint-check the image received so far.
    pub fn validate(&self) -> Validation {
        let calculated_crc = self.digest.value();
        Validation {
            size: self.bytes_received,
            calculated_crc,
            expected_crc: self.expected_crc,
            valid: calculated_crc == self.expected_crc,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(total_size: u32, expected_crc: u16) -> SessionRequest {
        SessionRequest {
            total_size,
            expected_crc,
        }
    }

    #[test]
    fn begin_resets_transfer_state() {
        let mut session = Session::new();
        session.begin(request(512, 0x1234));
        session.accept_payload(&[0xAA; 100]);

        session.begin(request(2048, 0x5678));
        assert_eq!(session.total_size, 2048);
        assert_eq!(session.expected_crc, 0x5678);
        assert_eq!(session.expected_seq, 1);
        assert_eq!(session.bytes_received, 0);
        assert!(session.active);
        assert_eq!(session.digest.value(), ImageDigest::new().value());
    }

    #[test]
    fn clear_keeps_declared_size_for_reporting() {
        let mut session = Session::new();
        session.begin(request(512, 0x1234));
        session.accept_payload(&[0xAA; 256]);
        session.clear();

        assert!(!session.active);
        assert_eq!(session.expected_seq, 0);
        assert_eq!(session.bytes_received, 0);
        assert_eq!(session.total_size, 512);
        assert_eq!(session.expected_crc, 0x1234);
    }

    #[test]
    fn accept_payload_advances_cursor_and_sequence() {
        let mut session = Session::new();
        session.begin(request(512, 0));
        assert!(session.matches_sequence(1));

        session.accept_payload(&[0x11; 256]);
        assert_eq!(session.bytes_received, 256);
        assert_eq!(session.expected_seq, 2);
        assert!(session.matches_sequence(2));
        assert!(!session.matches_sequence(1));
        assert!(!session.is_complete());

        session.accept_payload(&[0x22; 256]);
        assert!(session.is_complete());
    }

    #[test]
    fn sequence_comparison_wraps_at_256() {
        let mut session = Session::new();
        session.begin(request(1024 * 1024, 0));
        session.expected_seq = 256;
        assert!(session.matches_sequence(0));
        session.expected_seq = 257;
        assert!(session.matches_sequence(1));
    }

    #[test]
    fn overflow_guard() {
        let mut session = Session::new();
        session.begin(request(300, 0));
        session.accept_payload(&[0u8; 200]);

        assert!(!session.would_overflow(100));
        assert!(session.would_overflow(101));
    }

    #[test]
    fn validate_matches_one_shot_checksum() {
        let image: Vec<u8> = (0u16..512).map(|i| (i * 7 % 256) as u8).collect();
        let expected = ImageDigest::checksum(&image);

        let mut session = Session::new();
        session.begin(request(512, expected));
        for chunk in image.chunks(254) {
            session.accept_payload(chunk);
        }

        let validation = session.validate();
        assert!(validation.valid);
        assert_eq!(validation.size, 512);
        assert_eq!(validation.calculated_crc, expected);
    }

    #[test]
    fn validate_detects_mismatch() {
        let mut session = Session::new();
        session.begin(request(4, 0x0000));
        session.accept_payload(&[1, 2, 3, 4]);

        let validation = session.validate();
        assert!(!validation.valid);
        assert_eq!(validation.expected_crc, 0x0000);
        assert_ne!(validation.calculated_crc, 0x0000);
    }
}
