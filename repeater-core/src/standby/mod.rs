//! Persisted permanent-standby flag layout.
//!
//! The repeater keeps a single configuration byte at a fixed storage
//! location. Bit 0 carries the permanent-standby flag; the remaining bits
//! are reserved and must be ignored on read and left clear on write.

use core::fmt;

/// Default storage location of the configuration byte.
pub const DEFAULT_STANDBY_ADDRESS: u16 = 0x1F00;

/// Bit carrying the permanent-standby flag inside the configuration byte.
pub const STANDBY_FLAG_MASK: u8 = 0x01;

/// Decodes the permanent-standby flag from a raw configuration byte.
#[must_use]
pub const fn decode_standby(byte: u8) -> bool {
    byte & STANDBY_FLAG_MASK != 0
}

/// Encodes the permanent-standby flag into a raw configuration byte.
///
/// Reserved bits are written as zero so a round trip through storage yields
/// exactly `0x01` or `0x00`.
#[must_use]
pub const fn encode_standby(enabled: bool) -> u8 {
    if enabled { STANDBY_FLAG_MASK } else { 0x00 }
}

/// Failure reported by the standby storage collaborator.
///
/// Storage faults are fatal to the operation that triggered them: the
/// in-memory flag and the state machine keep their last confirmed values so
/// the persisted and in-memory flags never diverge.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StorageError {
    /// The configuration byte could not be read back.
    Read,
    /// The configuration byte could not be written.
    Write,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Read => f.write_str("standby byte read failed"),
            StorageError::Write => f.write_str("standby byte write failed"),
        }
    }
}

impl StorageError {
    const READ_CODE: u8 = 0x00;
    const WRITE_CODE: u8 = 0x01;

    /// Encodes the error into a compact diagnostic code.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            StorageError::Read => Self::READ_CODE,
            StorageError::Write => Self::WRITE_CODE,
        }
    }

    /// Decodes a compact diagnostic code back into a storage error.
    #[must_use]
    pub const fn from_raw(code: u8) -> Option<Self> {
        match code {
            Self::READ_CODE => Some(StorageError::Read),
            Self::WRITE_CODE => Some(StorageError::Write),
            _ => None,
        }
    }
}
