//! Driver configuration
//!
//! Output drive options and logging verbosity are runtime values consumed by
//! [`Pca9685::initialize`](crate::Pca9685::initialize), not build flags.

use crate::error::{PwmError, Result};
use pca9685_chip::record::DutyCount;
use pca9685_chip::regs::{mode1, mode2};

/// How raw 16-bit ON/OFF values are turned into register bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPolicy {
    /// Split the 16-bit word into two bytes unchanged. Bit 12 reaches the
    /// chip as the full-on/full-off override.
    #[default]
    Passthrough,

    /// Keep only the low 12 bits.
    Mask,

    /// Reject values above 4095 with `PwmError::CountOutOfRange`.
    Reject,
}

impl CountPolicy {
    /// Apply the policy to one value
    ///
    /// # Errors
    ///
    /// Returns `PwmError::CountOutOfRange` under [`CountPolicy::Reject`].
    pub fn apply(self, value: u16) -> Result<u16> {
        match self {
            Self::Passthrough => Ok(value),
            Self::Mask => Ok(DutyCount::masked(value).get()),
            Self::Reject => DutyCount::new(value)
                .map(DutyCount::get)
                .ok_or(PwmError::CountOutOfRange { value }),
        }
    }
}

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Log transaction payloads at `debug` instead of `trace`
    pub debug_logging: bool,

    /// Invert output logic (MODE2.INVRT)
    pub invert_outputs: bool,

    /// Open-drain outputs instead of totem pole (MODE2.OUTDRV clear)
    pub open_drain_outputs: bool,

    /// Keep responding to the LED All Call address after init
    pub all_call: bool,

    /// Respond to sub-addresses 1..3 after init
    pub sub_addresses: [bool; 3],

    /// Treatment of ON/OFF values above 12 bits
    pub count_policy: CountPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            invert_outputs: false,
            open_drain_outputs: false,
            all_call: true,
            sub_addresses: [false; 3],
            count_policy: CountPolicy::Passthrough,
        }
    }
}

impl DriverConfig {
    /// Configuration with overrides from the environment
    ///
    /// Reads `PCA9685_DEBUG`, `PCA9685_INVERT`, `PCA9685_OPEN_DRAIN` and
    /// `PCA9685_STRICT_COUNTS`; `1`, `true`, `yes` and `on` enable a flag.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).is_some_and(|v| parse_flag(&v));

        let mut config = Self {
            debug_logging: flag("PCA9685_DEBUG"),
            invert_outputs: flag("PCA9685_INVERT"),
            open_drain_outputs: flag("PCA9685_OPEN_DRAIN"),
            ..Self::default()
        };
        if flag("PCA9685_STRICT_COUNTS") {
            config.count_policy = CountPolicy::Reject;
        }

        tracing::debug!("Driver config from environment: {config:?}");
        config
    }

    /// Enable payload logging
    #[must_use]
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Invert outputs
    #[must_use]
    pub fn with_inverted_outputs(mut self, enabled: bool) -> Self {
        self.invert_outputs = enabled;
        self
    }

    /// Use open-drain outputs
    #[must_use]
    pub fn with_open_drain_outputs(mut self, enabled: bool) -> Self {
        self.open_drain_outputs = enabled;
        self
    }

    /// Respond to the All Call address
    #[must_use]
    pub fn with_all_call(mut self, enabled: bool) -> Self {
        self.all_call = enabled;
        self
    }

    /// Respond to sub-address `index` (0..=2)
    ///
    /// # Panics
    ///
    /// Panics if `index > 2`.
    #[must_use]
    pub fn with_sub_address(mut self, index: usize, enabled: bool) -> Self {
        self.sub_addresses[index] = enabled;
        self
    }

    /// Set the count policy
    #[must_use]
    pub fn with_count_policy(mut self, policy: CountPolicy) -> Self {
        self.count_policy = policy;
        self
    }

    /// MODE1 value written at the end of init
    #[must_use]
    pub fn mode1(&self) -> u8 {
        let mut value = mode1::AI;
        if self.all_call {
            value |= mode1::ALLCALL;
        }
        for (bit, enabled) in mode1::SUB.iter().zip(self.sub_addresses) {
            if enabled {
                value |= bit;
            }
        }
        value
    }

    /// MODE2 value to write at init, or `None` if the power-on value stands
    #[must_use]
    pub const fn mode2(&self) -> Option<u8> {
        if !self.invert_outputs && !self.open_drain_outputs {
            return None;
        }
        let mut value = 0;
        if self.invert_outputs {
            value |= mode2::INVRT;
        }
        if !self.open_drain_outputs {
            value |= mode2::OUTDRV;
        }
        Some(value)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
