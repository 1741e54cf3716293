//! Userspace driver for the NXP PCA9685 16-channel, 12-bit PWM controller.
//!
//! Talks to the chip over Linux `i2c-dev`; no kernel driver beyond the
//! adapter's own is needed.
//!
//! # Layers
//!
//! ```text
//! Pca9685          init, frequency, channel records, diagnostics
//!   Transport      write_raw / write_register / read_register framing
//!     I2cBus       write / write_read
//!       I2cDevice      /dev/i2c-N (I2C_RDWR)
//!       SimulatedBus   in-memory chip for CI
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use pca9685_driver::prelude::*;
//!
//! # fn main() -> pca9685_driver::Result<()> {
//! let bus = I2cDevice::open(1, addr::DEFAULT)?;
//! let mut pwm = Pca9685::new(bus, addr::DEFAULT, DriverConfig::from_env())?;
//!
//! pwm.initialize(200.0)?;
//! pwm.set_channel(0, 0, 2048)?;
//! assert_eq!(pwm.get_channel(0)?, (0, 2048));
//!
//! println!("{}", pwm.dump_registers()?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod bus;
mod config;
mod controller;
mod device;
mod diag;
mod error;
pub mod sim;
pub mod transport;

pub use pca9685_chip::{addr, osc, record, regs};

pub use bus::I2cBus;
pub use config::{CountPolicy, DriverConfig};
pub use controller::Pca9685;
pub use device::I2cDevice;
pub use diag::{ModeRegisters, RegisterDump};
pub use error::{PwmError, Result};
pub use sim::{SimulatedBus, Transaction};
pub use transport::Transport;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        addr, CountPolicy, DriverConfig, I2cBus, I2cDevice, ModeRegisters, Pca9685, PwmError,
        RegisterDump, Result, SimulatedBus,
    };
}
