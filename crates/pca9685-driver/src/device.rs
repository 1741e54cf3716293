//! Linux `i2c-dev` bus handle
//!
//! Opens `/dev/i2c-N` and issues transactions with the `I2C_RDWR` ioctl, so a
//! register select and the following read go out as one combined message
//! sequence with no STOP in between.
//!
//! The device node is opened through rustix; the i2c-dev ioctls use libc
//! because they pass kernel structs by pointer.

// ioctl structs use u16 lengths and u32 message counts
#![allow(clippy::cast_possible_truncation)]

use crate::bus::I2cBus;
use crate::error::{PwmError, Result};
use pca9685_chip::addr;
use rustix::fs::{Mode, OFlags};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

/// `<linux/i2c-dev.h>` / `<linux/i2c.h>` constants
mod ioctls {
    /// Bind the default slave address for read()/write()
    pub const I2C_SLAVE: libc::c_ulong = 0x0703;
    /// Combined transaction
    pub const I2C_RDWR: libc::c_ulong = 0x0707;
    /// Message flag: read from slave
    pub const I2C_M_RD: u16 = 0x0001;
}

/// `struct i2c_msg`
#[repr(C)]
#[derive(Debug)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

/// `struct i2c_rdwr_ioctl_data`
#[repr(C)]
#[derive(Debug)]
struct I2cRdwrData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

/// Open `/dev/i2c-N` handle with a bound default slave address
///
/// The default address only matters for plain `read(2)`/`write(2)`; every
/// [`I2cBus`] call carries its own address, so the same handle can reach the
/// ALL_CALL address or other chips on the bus.
#[derive(Debug)]
pub struct I2cDevice {
    fd: OwnedFd,
    path: PathBuf,
    address: u8,
}

impl I2cDevice {
    /// Open adapter `adapter` (`/dev/i2c-{adapter}`) and bind `address`
    ///
    /// # Errors
    ///
    /// Returns `PwmError::Open` if the node cannot be opened and
    /// `PwmError::Address` if the address is not 7-bit or cannot be bound.
    pub fn open(adapter: u32, address: u8) -> Result<Self> {
        Self::open_path(format!("/dev/i2c-{adapter}"), address)
    }

    /// Open an explicit device node and bind `address`
    ///
    /// # Errors
    ///
    /// Same as [`I2cDevice::open`].
    pub fn open_path(path: impl Into<PathBuf>, address: u8) -> Result<Self> {
        let path = path.into();

        if !addr::is_valid(address) {
            return Err(PwmError::address(address, "not a 7-bit address"));
        }

        tracing::debug!("Opening {} for slave {address:#04x}", path.display());

        let fd = rustix::fs::open(
            path.as_path(),
            OFlags::RDWR | OFlags::CLOEXEC,
            Mode::empty(),
        )
        .map_err(|e| PwmError::Open {
            path: path.clone(),
            source: e.into(),
        })?;

        // SAFETY: I2C_SLAVE takes the address by value. fd is a valid open
        // descriptor owned by this function; no memory is shared with the kernel.
        let ret = unsafe {
            libc::ioctl(
                fd.as_raw_fd(),
                ioctls::I2C_SLAVE as _,
                libc::c_ulong::from(address),
            )
        };
        if ret < 0 {
            return Err(PwmError::address(
                address,
                format!("I2C_SLAVE failed: {}", io::Error::last_os_error()),
            ));
        }

        tracing::info!("Opened {} (slave {address:#04x})", path.display());

        Ok(Self { fd, path, address })
    }

    /// Device node path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Default slave address bound at open time
    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    fn transfer(&self, msgs: &mut [I2cMsg]) -> io::Result<()> {
        let mut data = I2cRdwrData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };

        // SAFETY: I2C_RDWR reads `data` and each message, writing only into
        // buffers of messages flagged I2C_M_RD. Invariants: (1) every buf
        // points to `len` valid bytes borrowed for the duration of this call;
        // (2) read buffers come from `&mut [u8]`; (3) struct layouts match
        // the kernel's; (4) fd is open for the lifetime of self.
        let ret =
            unsafe { libc::ioctl(self.fd.as_raw_fd(), ioctls::I2C_RDWR as _, &raw mut data) };

        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

fn message_len(len: usize) -> io::Result<u16> {
    u16::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("i2c message of {len} bytes too long"),
        )
    })
}

impl I2cBus for I2cDevice {
    fn write(&mut self, address: u8, bytes: &[u8]) -> io::Result<()> {
        // The kernel never writes through a write message's buffer.
        let mut msgs = [I2cMsg {
            addr: u16::from(address),
            flags: 0,
            len: message_len(bytes.len())?,
            buf: bytes.as_ptr().cast_mut(),
        }];
        self.transfer(&mut msgs)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> io::Result<()> {
        let mut msgs = [
            I2cMsg {
                addr: u16::from(address),
                flags: 0,
                len: message_len(write.len())?,
                buf: write.as_ptr().cast_mut(),
            },
            I2cMsg {
                addr: u16::from(address),
                flags: ioctls::I2C_M_RD,
                len: message_len(read.len())?,
                buf: read.as_mut_ptr(),
            },
        ];
        self.transfer(&mut msgs)
    }
}

impl AsFd for I2cDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for I2cDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Drop for I2cDevice {
    fn drop(&mut self) {
        tracing::info!("Closing {}", self.path.display());
    }
}
