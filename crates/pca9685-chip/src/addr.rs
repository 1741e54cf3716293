//! I²C-bus addresses understood by the PCA9685.
//!
//! All addresses here are 7-bit. The chip stores its programmable addresses
//! (SUBADRx, ALLCALLADR) in 8-bit form, with the R/W bit in bit 0.

/// Highest valid 7-bit slave address.
pub const MAX_ADDRESS: u8 = 0x7F;

/// Default slave address with A5..A0 strapped low.
pub const DEFAULT: u8 = 0x40;

/// General call address. Every device on the bus listens here.
pub const GENERAL_CALL: u8 = 0x00;

/// Software reset byte, sent to [`GENERAL_CALL`].
pub const SWRST: u8 = 0x06;

/// Power-on LED All Call address.
pub const ALL_CALL: u8 = 0x70;

/// Power-on sub-addresses 1..3.
pub const SUB_ADDRESSES: [u8; 3] = [0x71, 0x72, 0x74];

/// True if `address` fits in 7 bits.
#[must_use]
pub const fn is_valid(address: u8) -> bool {
    address <= MAX_ADDRESS
}

/// Convert an 8-bit register form (SUBADRx / ALLCALLADR) to a 7-bit address.
#[must_use]
pub const fn from_register(value: u8) -> u8 {
    value >> 1
}
