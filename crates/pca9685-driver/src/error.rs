//! Error types for PCA9685 driver operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for PCA9685 operations
pub type Result<T> = std::result::Result<T, PwmError>;

/// Errors that can occur during PCA9685 operations
#[derive(Debug, Error)]
pub enum PwmError {
    /// Bus device node could not be opened
    #[error("Cannot open {}: {source}", path.display())]
    Open {
        /// Device node that was opened
        path: PathBuf,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// Slave address invalid or could not be bound
    #[error("Bad slave address {address:#04x}: {reason}")]
    Address {
        /// Requested 7-bit address
        address: u8,
        /// Reason for failure
        reason: String,
    },

    /// Bus transaction rejected (no ACK, arbitration loss, I/O error)
    #[error(
        "Transaction failed on addr {address:#04x}{} ({len} bytes): {source}",
        .register.map(|r| format!(" reg {r:#04x}")).unwrap_or_default()
    )]
    Transaction {
        /// Slave address of the transaction
        address: u8,
        /// First register selected, `None` for raw writes
        register: Option<u8>,
        /// Payload length in bytes
        len: usize,
        /// Underlying bus error
        source: std::io::Error,
    },

    /// Channel index out of range
    #[error("Channel {channel} out of range (have 16 channels)")]
    InvalidChannel {
        /// Requested channel
        channel: u8,
    },

    /// Duty count does not fit in 12 bits
    #[error("Count {value:#06x} exceeds 12 bits")]
    CountOutOfRange {
        /// Rejected value
        value: u16,
    },

    /// Payload larger than a single framed write allows
    #[error("Payload of {len} bytes exceeds {max} byte limit")]
    InvalidLength {
        /// Requested payload length
        len: usize,
        /// Largest accepted payload
        max: usize,
    },
}

impl PwmError {
    /// Create an address error
    pub fn address(address: u8, reason: impl Into<String>) -> Self {
        Self::Address {
            address,
            reason: reason.into(),
        }
    }

    /// Create a transaction error
    pub fn transaction(
        address: u8,
        register: Option<u8>,
        len: usize,
        source: std::io::Error,
    ) -> Self {
        Self::Transaction {
            address,
            register,
            len,
            source,
        }
    }

    /// True for errors raised by the bus itself
    #[must_use]
    pub const fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction { .. })
    }
}
