//! Channel record layout and duty-cycle counts.
//!
//! Each channel owns four consecutive registers:
//!
//! ```text
//! +0  ON_L   ON count bits 7:0
//! +1  ON_H   ON count bits 11:8, bit 4 = full on
//! +2  OFF_L  OFF count bits 7:0
//! +3  OFF_H  OFF count bits 11:8, bit 4 = full off
//! ```
//!
//! The output goes high when the 12-bit counter reaches ON and low when it
//! reaches OFF.

use crate::regs::{CHANNELS, CHANNEL_STRIDE};

/// Size of one encoded record.
pub const RECORD_LEN: usize = CHANNEL_STRIDE as usize;

/// Size of all sixteen records written back to back.
pub const BANK_LEN: usize = RECORD_LEN * CHANNELS;

/// A 12-bit counter position (`0..=4095`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DutyCount(u16);

impl DutyCount {
    /// Largest counter position.
    pub const MAX: u16 = 0x0FFF;

    /// Full-on / full-off override (bit 4 of the `*_H` register).
    pub const FULL: u16 = 0x1000;

    /// Counter position zero.
    pub const ZERO: Self = Self(0);

    /// Wrap a count, or `None` if it does not fit in 12 bits.
    #[must_use]
    pub const fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Keep only the low 12 bits.
    #[must_use]
    pub const fn masked(value: u16) -> Self {
        Self(value & Self::MAX)
    }

    /// Raw counter value.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl From<DutyCount> for u16 {
    fn from(count: DutyCount) -> Self {
        count.0
    }
}

/// ON/OFF pair as stored in a channel's four registers.
///
/// Values are carried as raw 16-bit words; bit 12 is the hardware override
/// and is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelRecord {
    /// Counter position at which the output turns on.
    pub on: u16,
    /// Counter position at which the output turns off.
    pub off: u16,
}

impl ChannelRecord {
    /// Output permanently high.
    pub const FULL_ON: Self = Self {
        on: DutyCount::FULL,
        off: 0,
    };

    /// Output permanently low.
    pub const FULL_OFF: Self = Self {
        on: 0,
        off: DutyCount::FULL,
    };

    /// Build a record from raw words.
    #[must_use]
    pub const fn new(on: u16, off: u16) -> Self {
        Self { on, off }
    }

    /// Encode as ON_L, ON_H, OFF_L, OFF_H.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; RECORD_LEN] {
        let [on_l, on_h] = self.on.to_le_bytes();
        let [off_l, off_h] = self.off.to_le_bytes();
        [on_l, on_h, off_l, off_h]
    }

    /// Decode from ON_L, ON_H, OFF_L, OFF_H.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; RECORD_LEN]) -> Self {
        Self {
            on: u16::from_le_bytes([bytes[0], bytes[1]]),
            off: u16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }

    /// True if the full-on override is set.
    #[must_use]
    pub const fn is_full_on(self) -> bool {
        self.on & DutyCount::FULL != 0
    }

    /// True if the full-off override is set. Full off wins over full on.
    #[must_use]
    pub const fn is_full_off(self) -> bool {
        self.off & DutyCount::FULL != 0
    }
}

/// Pack sixteen ON/OFF pairs into one contiguous buffer starting at LED0_ON_L.
#[must_use]
pub fn encode_bank(on: &[u16; CHANNELS], off: &[u16; CHANNELS]) -> [u8; BANK_LEN] {
    let mut bank = [0u8; BANK_LEN];
    for ((chunk, &on), &off) in bank.chunks_exact_mut(RECORD_LEN).zip(on).zip(off) {
        chunk.copy_from_slice(&ChannelRecord::new(on, off).to_bytes());
    }
    bank
}

/// Split a contiguous LED0_ON_L..LED15_OFF_H buffer into ON and OFF arrays.
#[must_use]
pub fn decode_bank(bank: &[u8; BANK_LEN]) -> ([u16; CHANNELS], [u16; CHANNELS]) {
    let mut on = [0u16; CHANNELS];
    let mut off = [0u16; CHANNELS];
    for (i, chunk) in bank.chunks_exact(RECORD_LEN).enumerate() {
        let record = ChannelRecord::from_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        on[i] = record.on;
        off[i] = record.off;
    }
    (on, off)
}
