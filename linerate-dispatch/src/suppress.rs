use std::fmt;

use linerate_common::Rate;

/// Counts the lines dropped since the last report.
///
/// Owned by the dispatcher; a flush hands out a [`Summary`] and resets the count.
#[derive(Debug)]
pub struct SuppressionCounter {
    rate: Rate,
    count: u64,
}

impl SuppressionCounter {
    pub const fn new(rate: Rate) -> Self {
        Self { rate, count: 0 }
    }

    #[inline]
    pub fn increment(&mut self) {
        self.count += 1;
    }

    #[inline]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Returns a summary of the suppressed lines and resets the count, if any were suppressed.
    /// Calling this with a count of 0 does nothing.
    #[inline]
    pub fn flush_if_nonzero(&mut self) -> Option<Summary> {
        if self.count == 0 {
            return None;
        }

        let suppressed = std::mem::take(&mut self.count);
        Some(Summary { rate: self.rate, suppressed })
    }
}

/// A report of how many lines were suppressed under a given rate cap.
///
/// Displays as `Rate-limiting to <R> loglines/second. Suppressed <N>.`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    rate: Rate,
    suppressed: u64,
}

impl Summary {
    #[inline]
    pub const fn rate(&self) -> Rate {
        self.rate
    }

    #[inline]
    pub const fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate-limiting to {} loglines/second. Suppressed {}.", self.rate, self.suppressed)
    }
}
