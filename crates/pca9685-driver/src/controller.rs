//! PCA9685 device controller
//!
//! Multi-step procedures built on [`Transport`]: reset and init, frequency
//! programming, channel writes and read-backs, diagnostics.
//!
//! Every procedure stops at the first failed transaction and returns that
//! error unchanged. Nothing is retried or rolled back, so a failed
//! [`Pca9685::initialize`] or [`Pca9685::set_frequency`] can leave the chip
//! half-configured; call `initialize` again to recover.
//!
//! # Frequency programming
//!
//! ```text
//! read MODE1
//! MODE1 = (MODE1 & !RESTART) | SLEEP     oscillator off
//! PRE_SCALE = prescale(clamp(f))         ignored by the chip unless asleep
//! MODE1 &= !SLEEP                        oscillator on
//! wait >= 500 µs                         oscillator settles
//! MODE1 |= RESTART                       resume PWM
//! ```

use crate::bus::I2cBus;
use crate::config::DriverConfig;
use crate::diag::{ModeRegisters, RegisterDump};
use crate::error::{PwmError, Result};
use crate::transport::Transport;
use pca9685_chip::record::{self, ChannelRecord, DutyCount, BANK_LEN, RECORD_LEN};
use pca9685_chip::regs::{self, mode1, CHANNELS, HIGH_REGS, LOW_REGS};
use pca9685_chip::{addr, osc};
use tracing::{debug, info, trace, warn};

/// Driver for one PCA9685
///
/// Holds the bus, the default slave address and the configuration. All
/// operations take `&mut self`; the driver does no locking of its own.
#[derive(Debug)]
pub struct Pca9685<B> {
    transport: Transport<B>,
    address: u8,
    config: DriverConfig,
}

impl<B: I2cBus> Pca9685<B> {
    /// Create a driver for the chip at `address`
    ///
    /// No bus traffic happens until the first operation.
    ///
    /// # Errors
    ///
    /// Returns `PwmError::Address` if `address` is not a 7-bit address.
    pub fn new(bus: B, address: u8, config: DriverConfig) -> Result<Self> {
        if !addr::is_valid(address) {
            return Err(PwmError::address(address, "not a 7-bit address"));
        }
        Ok(Self {
            transport: Transport::new(bus, config.debug_logging),
            address,
            config,
        })
    }

    /// Slave address used by every operation
    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect on the next `initialize`.
    pub fn set_config(&mut self, config: DriverConfig) {
        self.transport.set_log_payloads(config.debug_logging);
        self.config = config;
    }

    /// Borrow the bus
    #[must_use]
    pub const fn bus(&self) -> &B {
        self.transport.bus()
    }

    /// Borrow the bus mutably
    pub fn bus_mut(&mut self) -> &mut B {
        self.transport.bus_mut()
    }

    /// Release the bus
    pub fn into_inner(self) -> B {
        self.transport.into_inner()
    }

    /// Driver on the same bus for another address
    ///
    /// Used to reach the ALL_CALL or a sub-address:
    ///
    /// ```no_run
    /// # use pca9685_driver::{addr, DriverConfig, I2cDevice, Pca9685};
    /// # fn main() -> pca9685_driver::Result<()> {
    /// let bus = I2cDevice::open(1, addr::DEFAULT)?;
    /// let mut pwm = Pca9685::new(bus, addr::DEFAULT, DriverConfig::default())?;
    /// pwm.at(addr::ALL_CALL)?.set_all_channels(0, 2048)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PwmError::Address` if `address` is not a 7-bit address.
    pub fn at(&mut self, address: u8) -> Result<Pca9685<&mut B>> {
        Pca9685::new(self.transport.bus_mut(), address, self.config.clone())
    }

    // ── Init and frequency ───────────────────────────────────────────────────

    /// Reset the chip, turn every output off, program `frequency` and
    /// apply the configured mode bits
    ///
    /// Steps, each only after the previous one succeeded:
    /// 1. software reset (`SWRST` to the general-call address, no register byte)
    /// 2. MODE1 = reset value plus AI, so the next record spans four registers
    /// 3. all channels `(0, 0)` through the ALL_LED record
    /// 4. [`Pca9685::set_frequency`]
    /// 5. MODE1 = AI plus the configured ALLCALL/SUBx bits
    /// 6. MODE2, only if inverted or open-drain outputs are configured
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; later steps are not attempted.
    pub fn initialize(&mut self, frequency: f64) -> Result<()> {
        info!(
            "Initializing PCA9685 at {:#04x} ({frequency} Hz)",
            self.address
        );

        self.transport.write_raw(addr::GENERAL_CALL, &[addr::SWRST])?;

        // Reset clears AI; without it the ALL_LED record lands in ALL_LED_ON_L only.
        self.write_mode1(mode1::RESET_VALUE | mode1::AI)?;

        self.set_all_channels(0, 0)?;

        self.set_frequency(frequency)?;

        self.write_mode1(self.config.mode1())?;

        if let Some(mode2) = self.config.mode2() {
            debug!(
                "MODE2 = {mode2:#04x} (inverted={}, open_drain={})",
                self.config.invert_outputs, self.config.open_drain_outputs
            );
            self.transport.write_register(self.address, regs::MODE2, &[mode2])?;
        }

        info!("PCA9685 at {:#04x} initialized", self.address);
        Ok(())
    }

    /// Program the PWM frequency, returning the prescale written
    ///
    /// `frequency` is clamped into 40–1000 Hz first; clamping is logged as a
    /// warning, not reported as an error.
    ///
    /// # Errors
    ///
    /// Returns the first failing transaction's error. The chip may be left
    /// asleep if a later write fails.
    #[allow(clippy::float_cmp)]
    pub fn set_frequency(&mut self, frequency: f64) -> Result<u8> {
        let [mut m1] = self.transport.read_array::<1>(self.address, regs::MODE1)?;

        m1 = (m1 & !mode1::RESTART) | mode1::SLEEP;
        self.write_mode1(m1)?;

        let clamped = osc::clamp_frequency(frequency);
        if clamped != frequency {
            warn!(
                "Frequency {frequency} Hz outside {}..={} Hz, using {clamped} Hz",
                osc::MIN_FREQUENCY_HZ,
                osc::MAX_FREQUENCY_HZ
            );
        }

        let prescale = osc::prescale_for(clamped);
        debug!("Prescale {prescale} for {clamped} Hz");
        self.transport
            .write_register(self.address, regs::PRE_SCALE, &[prescale])?;

        m1 &= !mode1::SLEEP;
        self.write_mode1(m1)?;

        std::thread::sleep(osc::STABILIZATION_DELAY);

        m1 |= mode1::RESTART;
        self.write_mode1(m1)?;

        Ok(prescale)
    }

    /// Effective PWM frequency computed from PRE_SCALE
    ///
    /// # Errors
    ///
    /// Returns the read's transaction error.
    pub fn frequency(&mut self) -> Result<f64> {
        let [prescale] = self
            .transport
            .read_array::<1>(self.address, regs::PRE_SCALE)?;
        Ok(osc::frequency_for_prescale(prescale))
    }

    /// Stop the oscillator. Outputs go off; channel registers are kept.
    ///
    /// # Errors
    ///
    /// Returns the first failing transaction's error.
    pub fn sleep(&mut self) -> Result<()> {
        let [m1] = self.transport.read_array::<1>(self.address, regs::MODE1)?;
        self.write_mode1((m1 & !mode1::RESTART) | mode1::SLEEP)
    }

    /// Restart the oscillator and, if a restart is pending, resume PWM
    ///
    /// # Errors
    ///
    /// Returns the first failing transaction's error.
    pub fn wake(&mut self) -> Result<()> {
        let [m1] = self.transport.read_array::<1>(self.address, regs::MODE1)?;
        if m1 & mode1::SLEEP == 0 {
            trace!("{:#04x} already awake", self.address);
            return Ok(());
        }

        let awake = m1 & !(mode1::SLEEP | mode1::RESTART);
        self.write_mode1(awake)?;

        if m1 & mode1::RESTART != 0 {
            std::thread::sleep(osc::STABILIZATION_DELAY);
            self.write_mode1(awake | mode1::RESTART)?;
        }
        Ok(())
    }

    // ── Channels ─────────────────────────────────────────────────────────────

    /// Write one channel's ON/OFF counts in a single transaction
    ///
    /// # Errors
    ///
    /// `PwmError::InvalidChannel` for `channel >= 16`,
    /// `PwmError::CountOutOfRange` under the reject policy, or the
    /// transaction error.
    pub fn set_channel(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        let base = channel_base(channel)?;
        let record = self.record(on, off)?;
        trace!("Channel {channel}: on {on} off {off}");
        self.write_record(base, record)
    }

    /// Write the same ON/OFF counts to every channel through ALL_LED
    ///
    /// # Errors
    ///
    /// `PwmError::CountOutOfRange` under the reject policy, or the
    /// transaction error.
    pub fn set_all_channels(&mut self, on: u16, off: u16) -> Result<()> {
        let record = self.record(on, off)?;
        trace!("All channels: on {on} off {off}");
        self.write_record(regs::ALL_LED_ON_L, record)
    }

    /// Write all sixteen channel records in one 64-byte transaction
    ///
    /// # Errors
    ///
    /// `PwmError::CountOutOfRange` under the reject policy (nothing is
    /// written), or the transaction error.
    pub fn set_all_channels_bulk(
        &mut self,
        on: &[u16; CHANNELS],
        off: &[u16; CHANNELS],
    ) -> Result<()> {
        let policy = self.config.count_policy;
        let mut on_counts = [0u16; CHANNELS];
        let mut off_counts = [0u16; CHANNELS];
        for i in 0..CHANNELS {
            on_counts[i] = policy.apply(on[i])?;
            off_counts[i] = policy.apply(off[i])?;
        }

        trace!("Bulk on {on_counts:?} off {off_counts:?}");
        let bank = record::encode_bank(&on_counts, &off_counts);
        self.transport.write_register(self.address, regs::LED0_ON_L, &bank)
    }

    /// Force a channel fully on (bit-12 override)
    ///
    /// # Errors
    ///
    /// `PwmError::InvalidChannel` or the transaction error.
    pub fn set_channel_full_on(&mut self, channel: u8) -> Result<()> {
        let base = channel_base(channel)?;
        self.write_record(base, ChannelRecord::FULL_ON)
    }

    /// Force a channel fully off (bit-12 override)
    ///
    /// # Errors
    ///
    /// `PwmError::InvalidChannel` or the transaction error.
    pub fn set_channel_full_off(&mut self, channel: u8) -> Result<()> {
        let base = channel_base(channel)?;
        self.write_record(base, ChannelRecord::FULL_OFF)
    }

    /// Set a channel's duty cycle from a fraction in `0.0..=1.0`
    ///
    /// Values at or below 0 (and NaN) use full off, values at or above 1 use
    /// full on; anything between turns on at count 0 and off at
    /// `round(fraction × 4096)`.
    ///
    /// # Errors
    ///
    /// `PwmError::InvalidChannel` or the transaction error.
    pub fn set_channel_duty(&mut self, channel: u8, fraction: f64) -> Result<()> {
        let base = channel_base(channel)?;
        self.write_record(base, duty_record(fraction))
    }

    /// Read one channel's ON/OFF counts
    ///
    /// # Errors
    ///
    /// `PwmError::InvalidChannel` or the transaction error.
    pub fn get_channel(&mut self, channel: u8) -> Result<(u16, u16)> {
        let base = channel_base(channel)?;
        let bytes = self
            .transport
            .read_array::<RECORD_LEN>(self.address, base)?;
        let record = ChannelRecord::from_bytes(bytes);
        Ok((record.on, record.off))
    }

    /// Read all sixteen channel records in one transaction
    ///
    /// # Errors
    ///
    /// Returns the transaction error.
    pub fn get_all_channels_bulk(&mut self) -> Result<([u16; CHANNELS], [u16; CHANNELS])> {
        let bank = self
            .transport
            .read_array::<BANK_LEN>(self.address, regs::LED0_ON_L)?;
        Ok(record::decode_bank(&bank))
    }

    // ── Diagnostics ──────────────────────────────────────────────────────────

    /// Read MODE1 and MODE2 in one two-byte transaction
    ///
    /// # Errors
    ///
    /// Returns the transaction error.
    pub fn get_mode_registers(&mut self) -> Result<ModeRegisters> {
        let [mode1, mode2] = self.transport.read_array::<2>(self.address, regs::MODE1)?;
        Ok(ModeRegisters { mode1, mode2 })
    }

    /// Read the low and high register blocks
    ///
    /// Two transactions (70 + 6 bytes). If the low block read fails the
    /// high block is not attempted.
    ///
    /// # Errors
    ///
    /// Returns the first failing read's error.
    pub fn dump_registers(&mut self) -> Result<RegisterDump> {
        let low = self
            .transport
            .read_array::<LOW_REGS>(self.address, regs::FIRST_LOW_REG)?;
        let high = self
            .transport
            .read_array::<HIGH_REGS>(self.address, regs::FIRST_HIGH_REG)?;

        let dump = RegisterDump { low, high };
        debug!("Register dump of {:#04x}:\n{dump}", self.address);
        Ok(dump)
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn record(&self, on: u16, off: u16) -> Result<ChannelRecord> {
        let policy = self.config.count_policy;
        Ok(ChannelRecord::new(policy.apply(on)?, policy.apply(off)?))
    }

    fn write_record(&mut self, base: u8, record: ChannelRecord) -> Result<()> {
        self.transport.write_register(self.address, base, &record.to_bytes())
    }

    fn write_mode1(&mut self, value: u8) -> Result<()> {
        trace!("MODE1 = {value:#04x}");
        self.transport.write_register(self.address, regs::MODE1, &[value])
    }
}

fn channel_base(channel: u8) -> Result<u8> {
    regs::channel_base(channel).ok_or(PwmError::InvalidChannel { channel })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn duty_record(fraction: f64) -> ChannelRecord {
    if fraction.is_nan() || fraction <= 0.0 {
        ChannelRecord::FULL_OFF
    } else if fraction >= 1.0 {
        ChannelRecord::FULL_ON
    } else {
        let off = (fraction * 4096.0).round().min(f64::from(DutyCount::MAX)) as u16;
        ChannelRecord::new(0, off)
    }
}
