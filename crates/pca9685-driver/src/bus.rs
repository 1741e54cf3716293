//! Bus abstraction for the two-wire (I²C) transport
//!
//! The driver needs exactly two bus primitives: a plain write, and a combined
//! write-then-read issued without releasing the bus in between (repeated
//! START). Both block until the transaction completes.
//!
//! Implementations:
//! - [`I2cDevice`](crate::I2cDevice): Linux `/dev/i2c-N` via `I2C_RDWR`
//! - [`SimulatedBus`](crate::SimulatedBus): in-memory chip model for CI

use std::io;

/// Synchronous I²C bus primitive.
pub trait I2cBus {
    /// Write `bytes` to the slave at `address` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns the OS/bus error if the transaction is not acknowledged or fails.
    fn write(&mut self, address: u8, bytes: &[u8]) -> io::Result<()>;

    /// Write `write`, then read `read.len()` bytes, as one combined transaction.
    ///
    /// # Errors
    ///
    /// Returns the OS/bus error if either message fails.
    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> io::Result<()>;
}

impl<B: I2cBus + ?Sized> I2cBus for &mut B {
    fn write(&mut self, address: u8, bytes: &[u8]) -> io::Result<()> {
        (**self).write(address, bytes)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> io::Result<()> {
        (**self).write_read(address, write, read)
    }
}

impl<B: I2cBus + ?Sized> I2cBus for Box<B> {
    fn write(&mut self, address: u8, bytes: &[u8]) -> io::Result<()> {
        (**self).write(address, bytes)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> io::Result<()> {
        (**self).write_read(address, write, read)
    }
}
