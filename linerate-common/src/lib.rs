use std::{fmt, num::NonZeroU32, time::Duration};

use thiserror::Error;

/// The default rate cap, in lines per second.
pub const DEFAULT_RATE: u32 = 5;

/// The default period of the "bucket full" housekeeping check.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid rate {0}: must be at least 1 line per second")]
    InvalidRate(i64),
}

/// A validated rate cap, in lines per second. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rate(NonZeroU32);

impl Rate {
    /// Creates a new rate. Returns `None` if `per_second` is 0.
    #[inline]
    pub const fn new(per_second: u32) -> Option<Self> {
        match NonZeroU32::new(per_second) {
            Some(rate) => Some(Self(rate)),
            None => None,
        }
    }

    #[inline]
    pub const fn get(&self) -> u32 {
        self.0.get()
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(DEFAULT_RATE - 1))
    }
}

impl TryFrom<i64> for Rate {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(ConfigError::InvalidRate(value))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What to do with lines that exceed the rate cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Discard excess lines and report how many were suppressed.
    #[default]
    Drop,
    /// Hold excess lines until there is capacity. Nothing is lost, but latency is unbounded.
    Delay,
}

impl Mode {
    /// Maps the "keep" flag to a mode: keeping lines means delaying them.
    #[inline]
    pub const fn from_keep(keep: bool) -> Self {
        if keep {
            Self::Delay
        } else {
            Self::Drop
        }
    }

    #[inline]
    pub const fn is_delay(&self) -> bool {
        matches!(self, Self::Delay)
    }
}
