//! Silicon model for the NXP PCA9685 16-channel, 12-bit PWM controller.
//!
//! This crate has **no dependencies** and **no hardware access**; it is a
//! pure model of the silicon: register addresses, bit definitions, bus-level
//! addresses, the oscillator/prescale relationship and the 4-byte channel
//! record layout.
//!
//! Values follow the PCA9685 product data sheet (Rev. 4, April 2015).
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Register map: offsets, MODE1/MODE2 bits, channel stride, dump blocks |
//! | [`addr`] | Bus addresses: general call, software reset, ALL_CALL, sub-addresses |
//! | [`osc`] | Internal oscillator, supported frequency range, prescale formula |
//! | [`record`] | `DutyCount` and the ON_L/ON_H/OFF_L/OFF_H channel record |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod addr;
pub mod osc;
pub mod record;
pub mod regs;
