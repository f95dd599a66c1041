//! Image fingerprint: CRC-16/CCITT-FALSE over the written image bytes.
//!
//! The same algorithm fingerprints payloads as they are accepted during a
//! transfer and checks the finished image at verify time, so both sides of
//! the comparison agree byte-for-byte. The peer computes `expected_crc`
//! with this exact algorithm.

use crc::{Crc, CRC_16_IBM_3740};

const IMAGE_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Incremental CRC over the image as it lands in flash.
///
/// CRC-16/CCITT-FALSE has refout=false and xorout=0x0000, so the finalized
/// value equals the raw register and the digest can be resumed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDigest {
    state: u16,
}

impl ImageDigest {
    pub fn new() -> Self {
        Self {
            state: CRC_16_IBM_3740.init,
        }
    }

    /// Fold another accepted payload into the fingerprint.
    pub fn update(&mut self, bytes: &[u8]) {
        let mut digest = IMAGE_CRC.digest_with_initial(self.state);
        digest.update(bytes);
        self.state = digest.finalize();
    }

    /// The fingerprint of everything folded in so far.
    pub fn value(&self) -> u16 {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = CRC_16_IBM_3740.init;
    }

    /// One-shot fingerprint of a complete byte sequence.
    pub fn checksum(bytes: &[u8]) -> u16 {
        IMAGE_CRC.checksum(bytes)
    }
}

impl Default for ImageDigest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_check_value() {
        // CRC-16/CCITT-FALSE check value for "123456789".
        assert_eq!(ImageDigest::checksum(b"123456789"), 0x29B1);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data: Vec<u8> = (0u16..512).map(|i| (i % 251) as u8).collect();

        let mut digest = ImageDigest::new();
        for chunk in data.chunks(100) {
            digest.update(chunk);
        }

        assert_eq!(digest.value(), ImageDigest::checksum(&data));
    }

    #[test]
    fn empty_digest_is_init_value() {
        let digest = ImageDigest::new();
        assert_eq!(digest.value(), ImageDigest::checksum(&[]));
    }

    #[test]
    fn reset_restarts_fingerprint() {
        let mut digest = ImageDigest::new();
        digest.update(b"stale session data");
        digest.reset();
        digest.update(b"123456789");
        assert_eq!(digest.value(), 0x29B1);
    }

    #[test]
    fn distinct_inputs_distinct_fingerprints() {
        assert_ne!(
            ImageDigest::checksum(b"firmware image A"),
            ImageDigest::checksum(b"firmware image B")
        );
    }
}
