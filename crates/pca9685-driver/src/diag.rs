//! Diagnostic read-back types
//!
//! [`ModeRegisters`] decodes MODE1/MODE2; [`RegisterDump`] holds both
//! register blocks and renders them as a table.

use pca9685_chip::osc;
use pca9685_chip::record::ChannelRecord;
use pca9685_chip::regs::{self, mode1, mode2, CHANNELS, HIGH_REGS, LOW_REGS};
use std::fmt;

/// MODE1 and MODE2 as read from the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRegisters {
    /// Raw MODE1
    pub mode1: u8,
    /// Raw MODE2
    pub mode2: u8,
}

impl ModeRegisters {
    /// Restart pending
    #[inline]
    pub const fn restart(&self) -> bool {
        self.mode1 & mode1::RESTART != 0
    }

    /// External clock selected
    #[inline]
    pub const fn external_clock(&self) -> bool {
        self.mode1 & mode1::EXTCLK != 0
    }

    /// Register auto-increment enabled
    #[inline]
    pub const fn auto_increment(&self) -> bool {
        self.mode1 & mode1::AI != 0
    }

    /// Oscillator off
    #[inline]
    pub const fn sleeping(&self) -> bool {
        self.mode1 & mode1::SLEEP != 0
    }

    /// Responds to sub-address `index` (0..=2)
    ///
    /// # Panics
    ///
    /// Panics if `index > 2`.
    #[inline]
    pub const fn sub_address(&self, index: usize) -> bool {
        self.mode1 & mode1::SUB[index] != 0
    }

    /// Responds to the All Call address
    #[inline]
    pub const fn all_call(&self) -> bool {
        self.mode1 & mode1::ALLCALL != 0
    }

    /// Outputs inverted
    #[inline]
    pub const fn inverted(&self) -> bool {
        self.mode2 & mode2::INVRT != 0
    }

    /// Outputs change on ACK rather than STOP
    #[inline]
    pub const fn change_on_ack(&self) -> bool {
        self.mode2 & mode2::OCH != 0
    }

    /// Totem-pole outputs (open-drain when false)
    #[inline]
    pub const fn totem_pole(&self) -> bool {
        self.mode2 & mode2::OUTDRV != 0
    }

    /// OUTNE field
    #[inline]
    pub const fn output_not_enabled_mode(&self) -> u8 {
        self.mode2 & mode2::OUTNE
    }
}

impl fmt::Display for ModeRegisters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, name: &'static str| if set { name } else { "-" };
        write!(
            f,
            "MODE1 {:02x} [{} {} {} {} {} {} {} {}]  MODE2 {:02x} [{} {} {} OUTNE={}]",
            self.mode1,
            flag(self.restart(), "RESTART"),
            flag(self.external_clock(), "EXTCLK"),
            flag(self.auto_increment(), "AI"),
            flag(self.sleeping(), "SLEEP"),
            flag(self.sub_address(0), "SUB1"),
            flag(self.sub_address(1), "SUB2"),
            flag(self.sub_address(2), "SUB3"),
            flag(self.all_call(), "ALLCALL"),
            self.mode2,
            flag(self.inverted(), "INVRT"),
            flag(self.change_on_ack(), "OCH"),
            if self.totem_pole() { "TOTEM" } else { "OPEN-DRAIN" },
            self.output_not_enabled_mode(),
        )
    }
}

/// Snapshot of the low (`0x00..=0x45`) and high (`0xFA..=0xFF`) register blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDump {
    /// MODE1 through LED15_OFF_H
    pub low: [u8; LOW_REGS],
    /// ALL_LED_ON_L through TESTMODE
    pub high: [u8; HIGH_REGS],
}

impl RegisterDump {
    /// Total bytes read to build a dump
    pub const TOTAL_LEN: usize = LOW_REGS + HIGH_REGS;

    /// Value of any register in either block, `None` for reserved space
    #[must_use]
    pub fn register(&self, reg: u8) -> Option<u8> {
        let reg = reg as usize;
        if reg < LOW_REGS {
            Some(self.low[reg])
        } else if reg >= regs::FIRST_HIGH_REG as usize {
            Some(self.high[reg - regs::FIRST_HIGH_REG as usize])
        } else {
            None
        }
    }

    /// Mode registers
    #[must_use]
    pub const fn modes(&self) -> ModeRegisters {
        ModeRegisters {
            mode1: self.low[regs::MODE1 as usize],
            mode2: self.low[regs::MODE2 as usize],
        }
    }

    /// Prescale byte
    #[must_use]
    pub const fn prescale(&self) -> u8 {
        self.high[(regs::PRE_SCALE - regs::FIRST_HIGH_REG) as usize]
    }

    /// Record of one channel, `None` if `channel >= 16`
    #[must_use]
    pub fn channel(&self, channel: u8) -> Option<ChannelRecord> {
        let base = regs::channel_base(channel)? as usize;
        Some(ChannelRecord::from_bytes([
            self.low[base],
            self.low[base + 1],
            self.low[base + 2],
            self.low[base + 3],
        ]))
    }
}

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.modes())?;
        writeln!(
            f,
            "SUBADR1 {:02x}  SUBADR2 {:02x}  SUBADR3 {:02x}  ALLCALLADR {:02x}",
            self.low[regs::SUBADR1 as usize],
            self.low[regs::SUBADR2 as usize],
            self.low[regs::SUBADR3 as usize],
            self.low[regs::ALLCALLADR as usize],
        )?;
        writeln!(f)?;
        writeln!(f, "CH   ON_L ON_H OFF_L OFF_H     ON    OFF")?;

        for (channel, chunk) in self.low[regs::CONTROL_REGS..]
            .chunks_exact(regs::CHANNEL_STRIDE as usize)
            .enumerate()
        {
            let record = ChannelRecord::from_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let state = if record.is_full_off() {
                "  full off"
            } else if record.is_full_on() {
                "  full on"
            } else {
                ""
            };
            writeln!(
                f,
                "{channel:>2}    {:02x}   {:02x}    {:02x}    {:02x}  {:>5}  {:>5}{state}",
                chunk[0], chunk[1], chunk[2], chunk[3], record.on, record.off,
            )?;
        }
        debug_assert_eq!(CHANNELS * regs::CHANNEL_STRIDE as usize + regs::CONTROL_REGS, LOW_REGS);

        writeln!(f)?;
        writeln!(
            f,
            "ALL_LED {:02x} {:02x} {:02x} {:02x}",
            self.high[0], self.high[1], self.high[2], self.high[3]
        )?;
        write!(
            f,
            "PRE_SCALE {:02x} ({:.1} Hz)  TESTMODE {:02x}",
            self.prescale(),
            osc::frequency_for_prescale(self.prescale()),
            self.high[(regs::TESTMODE - regs::FIRST_HIGH_REG) as usize],
        )
    }
}
