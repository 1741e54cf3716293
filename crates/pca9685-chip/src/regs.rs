//! Register map for the PCA9685.
//!
//! ```text
//! 0x00        MODE1
//! 0x01        MODE2
//! 0x02-0x04   SUBADR1..SUBADR3
//! 0x05        ALLCALLADR
//! 0x06-0x45   LED0_ON_L .. LED15_OFF_H   (16 × 4-byte channel records)
//! 0x46-0xF9   reserved
//! 0xFA-0xFD   ALL_LED_ON_L .. ALL_LED_OFF_H  (broadcast record, reads 0)
//! 0xFE        PRE_SCALE   (writable only while MODE1.SLEEP = 1)
//! 0xFF        TESTMODE
//! ```

// ── Control ──────────────────────────────────────────────────────────────────

/// Mode register 1. Power-on value `0x11` (SLEEP | ALLCALL).
pub const MODE1: u8 = 0x00;
/// Mode register 2. Power-on value `0x04` (OUTDRV, totem pole).
pub const MODE2: u8 = 0x01;

/// I²C-bus sub-address 1 (8-bit form). Power-on value `0xE2`.
pub const SUBADR1: u8 = 0x02;
/// I²C-bus sub-address 2 (8-bit form). Power-on value `0xE4`.
pub const SUBADR2: u8 = 0x03;
/// I²C-bus sub-address 3 (8-bit form). Power-on value `0xE8`.
pub const SUBADR3: u8 = 0x04;
/// LED All Call I²C-bus address (8-bit form). Power-on value `0xE0`.
pub const ALLCALLADR: u8 = 0x05;

// ── Channel records ──────────────────────────────────────────────────────────

/// Number of PWM channels.
pub const CHANNELS: usize = 16;

/// Bytes per channel record (ON_L, ON_H, OFF_L, OFF_H).
pub const CHANNEL_STRIDE: u8 = 4;

/// First byte of channel 0's record.
pub const LED0_ON_L: u8 = 0x06;

/// Last register of the channel array (LED15_OFF_H).
pub const LED15_OFF_H: u8 = LED0_ON_L + CHANNELS as u8 * CHANNEL_STRIDE - 1;

/// Broadcast record: a write here updates every channel at once.
pub const ALL_LED_ON_L: u8 = 0xFA;
/// Broadcast ON count high byte.
pub const ALL_LED_ON_H: u8 = 0xFB;
/// Broadcast OFF count low byte.
pub const ALL_LED_OFF_L: u8 = 0xFC;
/// Broadcast OFF count high byte.
pub const ALL_LED_OFF_H: u8 = 0xFD;

/// Oscillator prescaler. Power-on value `0x1E` (200 Hz).
pub const PRE_SCALE: u8 = 0xFE;

/// Factory test mode. Never written by the driver.
pub const TESTMODE: u8 = 0xFF;

// ── Diagnostic blocks ────────────────────────────────────────────────────────

/// First register of the low block (modes, addresses, channel records).
pub const FIRST_LOW_REG: u8 = MODE1;
/// Number of registers in the low block (`0x00..=0x45`).
pub const LOW_REGS: usize = LED15_OFF_H as usize + 1;

/// First register of the high block (broadcast record, prescale, test mode).
pub const FIRST_HIGH_REG: u8 = ALL_LED_ON_L;
/// Number of registers in the high block (`0xFA..=0xFF`).
pub const HIGH_REGS: usize = 0x100 - FIRST_HIGH_REG as usize;

/// Registers at the start of the low block that precede the channel records.
pub const CONTROL_REGS: usize = LED0_ON_L as usize;

/// Base register of a channel's record, or `None` if `channel >= CHANNELS`.
#[must_use]
pub const fn channel_base(channel: u8) -> Option<u8> {
    if (channel as usize) < CHANNELS {
        Some(LED0_ON_L + channel * CHANNEL_STRIDE)
    } else {
        None
    }
}

// ── MODE1 bit definitions ────────────────────────────────────────────────────

pub mod mode1 {
    //! MODE1 bits.

    /// Restart enabled. Reads 1 when SLEEP was entered with PWM running;
    /// writing 1 clears it and resumes the previous PWM outputs.
    pub const RESTART: u8 = 1 << 7;
    /// Use the EXTCLK pin clock. Sticky until power cycle.
    pub const EXTCLK: u8 = 1 << 6;
    /// Register auto-increment.
    pub const AI: u8 = 1 << 5;
    /// Low-power mode, oscillator off.
    pub const SLEEP: u8 = 1 << 4;
    /// Respond to I²C-bus sub-address 1.
    pub const SUB1: u8 = 1 << 3;
    /// Respond to I²C-bus sub-address 2.
    pub const SUB2: u8 = 1 << 2;
    /// Respond to I²C-bus sub-address 3.
    pub const SUB3: u8 = 1 << 1;
    /// Respond to the LED All Call address.
    pub const ALLCALL: u8 = 1 << 0;

    /// Sub-address enable bits in SUBADR1..3 order.
    pub const SUB: [u8; 3] = [SUB1, SUB2, SUB3];

    /// Power-on value.
    pub const RESET_VALUE: u8 = SLEEP | ALLCALL;
}

// ── MODE2 bit definitions ────────────────────────────────────────────────────

pub mod mode2 {
    //! MODE2 bits.

    /// Invert output logic state.
    pub const INVRT: u8 = 1 << 4;
    /// Outputs change on ACK instead of STOP.
    pub const OCH: u8 = 1 << 3;
    /// Totem-pole outputs when set, open-drain when clear.
    pub const OUTDRV: u8 = 1 << 2;
    /// Output-not-enable behaviour (two bits).
    pub const OUTNE: u8 = 0b11;

    /// Power-on value.
    pub const RESET_VALUE: u8 = OUTDRV;
}

/// Bit 4 of an `*_H` register: full on (ON_H) or full off (OFF_H).
pub const FULL_BIT_H: u8 = 1 << 4;

/// Writable bits of an `*_H` register; bits 7:5 are reserved and read 0.
pub const HIGH_BYTE_MASK: u8 = 0x1F;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_records_fill_low_block() {
        assert_eq!(channel_base(0), Some(0x06));
        assert_eq!(channel_base(1), Some(0x0A));
        assert_eq!(channel_base(15), Some(0x42));
        assert_eq!(channel_base(16), None);
        assert_eq!(LED15_OFF_H, 0x45);
        assert_eq!(LOW_REGS, 70);
        assert_eq!(LOW_REGS, CONTROL_REGS + CHANNELS * CHANNEL_STRIDE as usize);
    }

    #[test]
    fn high_block_covers_broadcast_and_prescale() {
        assert_eq!(HIGH_REGS, 6);
        assert_eq!(ALL_LED_OFF_H, ALL_LED_ON_L + 3);
        assert!(PRE_SCALE >= FIRST_HIGH_REG);
        assert_eq!(FIRST_HIGH_REG as usize + HIGH_REGS - 1, TESTMODE as usize);
    }

    #[test]
    fn mode_bits_are_distinct() {
        let bits = [
            mode1::RESTART,
            mode1::EXTCLK,
            mode1::AI,
            mode1::SLEEP,
            mode1::SUB1,
            mode1::SUB2,
            mode1::SUB3,
            mode1::ALLCALL,
        ];
        assert_eq!(bits.iter().fold(0u8, |acc, b| acc | b), 0xFF);
        assert_eq!(mode1::RESET_VALUE, 0x11);
        assert_eq!(mode2::RESET_VALUE, 0x04);
    }
}
