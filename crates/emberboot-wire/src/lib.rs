//! Wire model for the emberboot DFU bootloader.
//!
//! This crate defines the framed-packet view, command type codes, negative
//! acknowledgement codes, the START_SESSION payload, flash layout constants,
//! and the image CRC fingerprint shared by the transfer and verify paths.

pub mod constants;
pub mod digest;
pub mod error;
pub mod packet;

pub use constants::{NackCode, PacketType};
pub use digest::ImageDigest;
pub use error::WireError;
pub use packet::{Packet, SessionRequest};
