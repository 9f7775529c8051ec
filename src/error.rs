//! Error types for bus registration and the CPU loop.

use thiserror::Error;

/// Returned by [`crate::bus::Bus::add_connection`] when the requested range overlaps an
/// existing connection. Never reaches the running core — the caller must resolve it at
/// registration time.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("bus connection starting at {start:#06X} (size {size:#06X}) overlaps an existing connection")]
pub struct BusOverlap {
    pub start: u16,
    pub size: u16,
}

/// Returned by [`crate::bus::Bus::remove_connection`] when no connection starts at the
/// given address.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no bus connection starts at {start:#06X}")]
pub struct ConnectionNotFound {
    pub start: u16,
}

/// Fatal errors that terminate the CPU loop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    #[error("unmapped bus read at {address:#06X}")]
    UnmappedRead { address: u16 },
    #[error("unmapped bus write at {address:#06X}")]
    UnmappedWrite { address: u16 },
    #[error("invalid opcode {opcode:#04X} at {address:#06X}")]
    InvalidOpcode { opcode: u8, address: u16 },
}
