//! Wire-level error types.

/// Failures while interpreting a framed packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("packet too short: {actual} bytes (minimum {min})")]
    TooShort { actual: usize, min: usize },

    #[error("packet too long: {actual} bytes (maximum {max})")]
    TooLong { actual: usize, max: usize },

    #[error("unknown packet type: 0x{0:02X}")]
    UnknownType(u8),

    #[error("session size out of range: {0} bytes")]
    SizeOutOfRange(u32),
}
