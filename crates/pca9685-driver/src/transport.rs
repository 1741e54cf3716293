//! Transaction framing
//!
//! The three primitives every controller operation is built from:
//!
//! - [`Transport::write_raw`]: bytes verbatim, one transaction
//! - [`Transport::write_register`]: start register prepended, relying on
//!   auto-increment to program a contiguous run in one transaction
//! - [`Transport::read_register`]: register select and read as one combined
//!   transaction, so no other master can move the register pointer between
//!   the two
//!
//! These are the only functions that touch the bus. Each attempt and each
//! failure is logged here; payload bytes go to `debug` when payload logging
//! is enabled and to `trace` otherwise.

use crate::bus::I2cBus;
use crate::error::{PwmError, Result};
use pca9685_chip::addr;
use pca9685_chip::record::BANK_LEN;
use std::fmt;

/// Largest payload after the register byte: all sixteen channel records.
pub const MAX_PAYLOAD: usize = BANK_LEN;

/// Largest framed write: register byte plus [`MAX_PAYLOAD`].
pub const MAX_WRITE_LEN: usize = MAX_PAYLOAD + 1;

/// Framing layer over an [`I2cBus`]
#[derive(Debug)]
pub struct Transport<B> {
    bus: B,
    log_payloads: bool,
}

impl<B: I2cBus> Transport<B> {
    /// Wrap a bus
    pub const fn new(bus: B, log_payloads: bool) -> Self {
        Self { bus, log_payloads }
    }

    /// Borrow the bus
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    /// Borrow the bus mutably
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Enable or disable payload logging
    pub fn set_log_payloads(&mut self, enabled: bool) {
        self.log_payloads = enabled;
    }

    /// Write `bytes` verbatim to `address`
    ///
    /// # Errors
    ///
    /// `PwmError::Address` for an 8-bit address, `PwmError::Transaction` if
    /// the bus rejects the write.
    pub fn write_raw(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
        self.write_framed(address, None, bytes, bytes.len())
    }

    /// Write `bytes` starting at `start_register`
    ///
    /// The register byte and payload are staged in a stack buffer and sent
    /// as a single write.
    ///
    /// # Errors
    ///
    /// `PwmError::InvalidLength` if `bytes` exceeds [`MAX_PAYLOAD`], plus the
    /// errors of [`Transport::write_raw`].
    pub fn write_register(
        &mut self,
        address: u8,
        start_register: u8,
        bytes: &[u8],
    ) -> Result<()> {
        if bytes.len() > MAX_PAYLOAD {
            return Err(PwmError::InvalidLength {
                len: bytes.len(),
                max: MAX_PAYLOAD,
            });
        }

        let mut frame = [0u8; MAX_WRITE_LEN];
        frame[0] = start_register;
        frame[1..=bytes.len()].copy_from_slice(bytes);

        self.write_framed(
            address,
            Some(start_register),
            &frame[..=bytes.len()],
            bytes.len(),
        )
    }

    /// Fill `buf` from consecutive registers starting at `start_register`
    ///
    /// # Errors
    ///
    /// `PwmError::Address` for an 8-bit address, `PwmError::Transaction` if
    /// either message of the combined transaction fails.
    pub fn read_register(
        &mut self,
        address: u8,
        start_register: u8,
        buf: &mut [u8],
    ) -> Result<()> {
        check_address(address)?;

        tracing::trace!(
            "read {address:#04x} reg {start_register:#04x} len {}",
            buf.len()
        );

        if let Err(e) = self.bus.write_read(address, &[start_register], buf) {
            tracing::warn!(
                "read failed on addr {address:#04x} reg {start_register:#04x} len {}: {e}",
                buf.len()
            );
            return Err(PwmError::transaction(
                address,
                Some(start_register),
                buf.len(),
                e,
            ));
        }

        if self.log_payloads {
            tracing::debug!("{address:#04x}:{start_register:02x} -> {}", Hex(buf));
        } else {
            tracing::trace!("{address:#04x}:{start_register:02x} -> {}", Hex(buf));
        }
        Ok(())
    }

    /// Read `N` consecutive registers into an array
    ///
    /// # Errors
    ///
    /// Same as [`Transport::read_register`].
    pub fn read_array<const N: usize>(
        &mut self,
        address: u8,
        start_register: u8,
    ) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_register(address, start_register, &mut buf)?;
        Ok(buf)
    }

    fn write_framed(
        &mut self,
        address: u8,
        register: Option<u8>,
        frame: &[u8],
        payload_len: usize,
    ) -> Result<()> {
        check_address(address)?;

        if self.log_payloads {
            tracing::debug!("write {address:#04x}: {}", Hex(frame));
        } else {
            tracing::trace!("write {address:#04x}: {}", Hex(frame));
        }

        self.bus.write(address, frame).map_err(|e| {
            tracing::warn!("write failed on addr {address:#04x} ({}): {e}", Hex(frame));
            PwmError::transaction(address, register, payload_len, e)
        })
    }
}

fn check_address(address: u8) -> Result<()> {
    if addr::is_valid(address) {
        Ok(())
    } else {
        Err(PwmError::address(address, "not a 7-bit address"))
    }
}

/// Space-separated hex bytes for log lines
struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
