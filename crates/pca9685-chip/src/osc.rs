//! Internal oscillator and PWM frequency programming.
//!
//! The PWM period is `4096` oscillator ticks times `(prescale + 1)`. The
//! driver computes the prescale byte with
//!
//! ```text
//! prescale = round(OSCILLATOR_HZ / (4096 × f) − 0.5)
//! ```
//!
//! after clamping `f` into [`MIN_FREQUENCY_HZ`, `MAX_FREQUENCY_HZ`].

use std::time::Duration;

/// Internal oscillator clock (Hz).
pub const OSCILLATOR_HZ: f64 = 25_000_000.0;

/// PWM resolution: counter ticks per period.
pub const COUNTS_PER_PERIOD: f64 = 4096.0;

/// Lowest frequency the driver will program (Hz).
pub const MIN_FREQUENCY_HZ: f64 = 40.0;

/// Highest frequency the driver will program (Hz).
pub const MAX_FREQUENCY_HZ: f64 = 1000.0;

/// Minimum wait after clearing SLEEP before setting RESTART.
///
/// The oscillator is not guaranteed stable earlier than this.
pub const STABILIZATION_DELAY: Duration = Duration::from_micros(500);

/// Clamp a requested frequency into the supported range.
///
/// NaN clamps to [`MIN_FREQUENCY_HZ`].
#[must_use]
pub fn clamp_frequency(frequency: f64) -> f64 {
    if frequency.is_nan() {
        return MIN_FREQUENCY_HZ;
    }
    frequency.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)
}

/// Prescale byte for a requested frequency (clamped first).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn prescale_for(frequency: f64) -> u8 {
    let frequency = clamp_frequency(frequency);
    // 6..=152 over the clamped range, always fits
    (OSCILLATOR_HZ / (COUNTS_PER_PERIOD * frequency) - 0.5).round() as u8
}

/// PWM frequency the chip runs at for a given prescale byte.
#[must_use]
pub fn frequency_for_prescale(prescale: u8) -> f64 {
    OSCILLATOR_HZ / (COUNTS_PER_PERIOD * (f64::from(prescale) + 1.0))
}
