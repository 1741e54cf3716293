// SPDX-License-Identifier: AGPL-3.0-only

//! Simulated PCA9685 on an in-memory bus
//!
//! `SimulatedBus` implements [`I2cBus`] over a register file that behaves like
//! the silicon where the driver depends on it:
//!
//! - power-on register values, restored by a general-call software reset
//! - the register pointer advances only while MODE1.AI is set
//! - ALL_CALL and sub-addresses answer only while their MODE1 bits are set
//! - PRE_SCALE writes are dropped unless MODE1.SLEEP is set
//! - RESTART is set on entering sleep and cleared by writing 1
//! - ALL_LED writes land in every channel; the ALL_LED registers read 0
//! - reserved bits of `*_H` and MODE2 read 0
//! - any other address NACKs (`ENXIO`)
//!
//! Every transaction is logged, and upcoming transactions can be made to
//! fail, so tests can check ordering and fail-fast behaviour without
//! hardware.

use crate::bus::I2cBus;
use pca9685_chip::addr;
use pca9685_chip::record::ChannelRecord;
use pca9685_chip::regs::{self, mode1, mode2};
use std::collections::BTreeSet;
use std::io;

/// One bus transaction as seen by the simulated chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// Plain write
    Write {
        /// Slave address
        address: u8,
        /// Bytes on the wire (register byte first for framed writes)
        bytes: Vec<u8>,
        /// Whether the transaction was acknowledged
        ok: bool,
    },

    /// Combined write-then-read
    WriteRead {
        /// Slave address
        address: u8,
        /// Bytes of the write message
        write: Vec<u8>,
        /// Length of the read message
        read_len: usize,
        /// Whether the transaction was acknowledged
        ok: bool,
    },
}

impl Transaction {
    /// Slave address
    #[must_use]
    pub const fn address(&self) -> u8 {
        match self {
            Self::Write { address, .. } | Self::WriteRead { address, .. } => *address,
        }
    }

    /// Whether the transaction succeeded
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        match self {
            Self::Write { ok, .. } | Self::WriteRead { ok, .. } => *ok,
        }
    }

    /// True for combined write-then-read transactions
    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::WriteRead { .. })
    }

    /// First register addressed, if the write carried one
    #[must_use]
    pub fn register(&self) -> Option<u8> {
        match self {
            Self::Write { bytes, .. } => bytes.first().copied(),
            Self::WriteRead { write, .. } => write.first().copied(),
        }
    }

    /// Data written after the register byte
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Write { bytes, .. } => bytes.get(1..).unwrap_or_default(),
            Self::WriteRead { write, .. } => write.get(1..).unwrap_or_default(),
        }
    }
}

/// In-memory bus with one PCA9685 attached
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    address: u8,
    regs: [u8; 256],
    pointer: u8,
    log: Vec<Transaction>,
    faults: BTreeSet<usize>,
    ignored_prescale_writes: usize,
}

impl SimulatedBus {
    /// Chip at `address` in its power-on state
    #[must_use]
    pub fn new(address: u8) -> Self {
        Self {
            address,
            regs: power_on_registers(),
            pointer: 0,
            log: Vec::new(),
            faults: BTreeSet::new(),
            ignored_prescale_writes: 0,
        }
    }

    /// Hardware address of the simulated chip
    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Current value of one register
    #[must_use]
    pub const fn register(&self, reg: u8) -> u8 {
        self.regs[reg as usize]
    }

    /// Set a register directly, bypassing the bus and write rules
    pub fn poke(&mut self, reg: u8, value: u8) {
        self.regs[reg as usize] = value;
    }

    /// Record currently held by `channel`
    ///
    /// # Panics
    ///
    /// Panics if `channel >= 16`.
    #[must_use]
    pub fn channel(&self, channel: u8) -> ChannelRecord {
        let base = regs::channel_base(channel).expect("channel out of range") as usize;
        ChannelRecord::from_bytes([
            self.regs[base],
            self.regs[base + 1],
            self.regs[base + 2],
            self.regs[base + 3],
        ])
    }

    /// All transactions so far, failed ones included
    #[must_use]
    pub fn log(&self) -> &[Transaction] {
        &self.log
    }

    /// Forget logged transactions
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Number of PRE_SCALE writes dropped because the oscillator was running
    #[must_use]
    pub const fn ignored_prescale_writes(&self) -> usize {
        self.ignored_prescale_writes
    }

    /// Make the `n`-th upcoming transaction fail with `EIO` (0 = the next one)
    pub fn fail_transaction(&mut self, n: usize) {
        self.faults.insert(self.log.len() + n);
    }

    /// Back to power-on state, keeping the log and pending faults
    pub fn power_cycle(&mut self) {
        self.regs = power_on_registers();
        self.pointer = 0;
    }

    fn take_fault(&mut self) -> Option<io::Error> {
        self.faults
            .remove(&self.log.len())
            .then(|| io::Error::from_raw_os_error(libc::EIO))
    }

    fn responds_to(&self, address: u8) -> bool {
        let m1 = self.regs[regs::MODE1 as usize];
        if address == self.address {
            return true;
        }
        if m1 & mode1::ALLCALL != 0
            && address == addr::from_register(self.regs[regs::ALLCALLADR as usize])
        {
            return true;
        }
        [regs::SUBADR1, regs::SUBADR2, regs::SUBADR3]
            .into_iter()
            .zip(mode1::SUB)
            .any(|(reg, bit)| {
                m1 & bit != 0 && address == addr::from_register(self.regs[reg as usize])
            })
    }

    fn auto_increment(&self) -> bool {
        self.regs[regs::MODE1 as usize] & mode1::AI != 0
    }

    fn advance(&mut self) {
        if self.auto_increment() {
            self.pointer = self.pointer.wrapping_add(1);
        }
    }

    /// Handle a write message addressed to this chip
    fn accept_write(&mut self, bytes: &[u8]) {
        let Some((&start, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = start;
        for &value in data {
            self.store(self.pointer, value);
            self.advance();
        }
    }

    fn store(&mut self, reg: u8, value: u8) {
        match reg {
            regs::MODE1 => self.store_mode1(value),
            regs::MODE2 => self.regs[reg as usize] = value & !(0b111 << 5),
            regs::LED0_ON_L..=regs::LED15_OFF_H => self.store_led(reg, value),
            regs::ALL_LED_ON_L..=regs::ALL_LED_OFF_H => {
                let offset = reg - regs::ALL_LED_ON_L;
                for channel in 0..regs::CHANNELS as u8 {
                    let base = regs::LED0_ON_L + channel * regs::CHANNEL_STRIDE;
                    self.store_led(base + offset, value);
                }
            }
            regs::PRE_SCALE => {
                if self.regs[regs::MODE1 as usize] & mode1::SLEEP != 0 {
                    self.regs[reg as usize] = value;
                } else {
                    self.ignored_prescale_writes += 1;
                }
            }
            r if r > regs::LED15_OFF_H && r < regs::ALL_LED_ON_L => {} // reserved
            _ => self.regs[reg as usize] = value,
        }
    }

    fn store_mode1(&mut self, value: u8) {
        let old = self.regs[regs::MODE1 as usize];

        // RESTART: writing 0 has no effect, writing 1 clears it.
        let mut new = (value & !mode1::RESTART) | (old & mode1::RESTART);
        if value & mode1::RESTART != 0 {
            new &= !mode1::RESTART;
        }
        if old & mode1::SLEEP == 0 && value & mode1::SLEEP != 0 {
            new |= mode1::RESTART;
        }
        // EXTCLK can only be cleared by power cycle or reset.
        new |= old & mode1::EXTCLK;

        self.regs[regs::MODE1 as usize] = new;
    }

    fn store_led(&mut self, reg: u8, value: u8) {
        let high_byte = (reg - regs::LED0_ON_L) % 2 == 1;
        self.regs[reg as usize] = if high_byte {
            value & regs::HIGH_BYTE_MASK
        } else {
            value
        };
    }

    fn load(&self, reg: u8) -> u8 {
        match reg {
            regs::ALL_LED_ON_L..=regs::ALL_LED_OFF_H => 0,
            _ => self.regs[reg as usize],
        }
    }
}

impl I2cBus for SimulatedBus {
    fn write(&mut self, address: u8, bytes: &[u8]) -> io::Result<()> {
        let result = if let Some(fault) = self.take_fault() {
            Err(fault)
        } else if address == addr::GENERAL_CALL {
            if bytes == [addr::SWRST] {
                self.power_cycle();
            }
            Ok(())
        } else if self.responds_to(address) {
            self.accept_write(bytes);
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(libc::ENXIO))
        };

        self.log.push(Transaction::Write {
            address,
            bytes: bytes.to_vec(),
            ok: result.is_ok(),
        });
        result
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> io::Result<()> {
        let result = if let Some(fault) = self.take_fault() {
            Err(fault)
        } else if self.responds_to(address) {
            self.accept_write(write);
            for byte in read.iter_mut() {
                *byte = self.load(self.pointer);
                self.advance();
            }
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(libc::ENXIO))
        };

        self.log.push(Transaction::WriteRead {
            address,
            write: write.to_vec(),
            read_len: read.len(),
            ok: result.is_ok(),
        });
        result
    }
}

fn power_on_registers() -> [u8; 256] {
    let mut r = [0u8; 256];
    r[regs::MODE1 as usize] = mode1::RESET_VALUE;
    r[regs::MODE2 as usize] = mode2::RESET_VALUE;
    r[regs::SUBADR1 as usize] = 0xE2;
    r[regs::SUBADR2 as usize] = 0xE4;
    r[regs::SUBADR3 as usize] = 0xE8;
    r[regs::ALLCALLADR as usize] = 0xE0;
    for channel in 0..regs::CHANNELS as u8 {
        // LEDn_OFF_H = 0x10: every output starts full off
        let base = regs::LED0_ON_L + channel * regs::CHANNEL_STRIDE;
        r[(base + 3) as usize] = regs::FULL_BIT_H;
    }
    r[regs::PRE_SCALE as usize] = 0x1E;
    r
}
