//! Token bucket admission control.
//!
//! A [`TokenBucket`] holds at most `R` tokens and refills continuously at `R` tokens per second.
//! Refill is lazy: every access first credits the tokens accrued since the previous access, so
//! idle periods recharge the bucket up to capacity without a background task.
//!
//! Token levels are tracked in integer units of `1 / NANOS_PER_TOKEN` tokens. One nanosecond at a
//! rate of `R` accrues exactly `R` units, so refill is exact and waits computed from a deficit
//! always end with a whole token available.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep, Instant};
use tracing::trace;

use linerate_common::Rate;

/// The number of level units in a single token.
const NANOS_PER_TOKEN: u128 = 1_000_000_000;

#[derive(Debug)]
struct BucketState {
    /// The current level, in units of `1 / NANOS_PER_TOKEN` tokens.
    level: u128,
    /// The last time the level was refilled.
    last_refill: Instant,
}

/// A rate limiter holding a capped, continuously refilling quota of tokens.
///
/// The bucket starts full. It is safe to share between tasks (e.g. behind an
/// [`Arc`](std::sync::Arc)); the internal lock is never held across an `.await`.
#[derive(Debug)]
pub struct TokenBucket {
    rate: Rate,
    /// The maximum level, in units.
    max_level: u128,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a new, full bucket with capacity and refill rate equal to `rate`.
    pub fn new(rate: Rate) -> Self {
        let max_level = u128::from(rate.get()) * NANOS_PER_TOKEN;

        Self {
            rate,
            max_level,
            state: Mutex::new(BucketState { level: max_level, last_refill: Instant::now() }),
        }
    }

    #[inline]
    pub const fn rate(&self) -> Rate {
        self.rate
    }

    /// The maximum number of tokens the bucket can hold.
    #[inline]
    pub const fn capacity(&self) -> u32 {
        self.rate.get()
    }

    /// Takes a single token if one is available. Never waits, and has no effect on failure.
    pub fn try_take(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.level >= NANOS_PER_TOKEN {
            state.level -= NANOS_PER_TOKEN;
            true
        } else {
            false
        }
    }

    /// Waits until a token is available, then takes it.
    ///
    /// If the bucket is momentarily empty this waits at most `1 / R` seconds. There is no
    /// timeout: a caller that keeps draining the bucket from elsewhere can be delayed
    /// indefinitely.
    pub async fn wait_take(&self) {
        loop {
            let wait = match self.take_or_deficit() {
                None => return,
                Some(wait) => wait,
            };

            trace!(?wait, "Bucket empty, waiting for refill");
            sleep(wait).await;
        }
    }

    /// Returns the current (fractional) number of available tokens, without consuming any.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);

        state.level as f64 / NANOS_PER_TOKEN as f64
    }

    /// Returns `true` if the bucket is completely full.
    pub fn is_full(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        state.level >= self.max_level
    }

    /// Takes a token if possible. Otherwise, returns how long it will take for the next
    /// token to accrue.
    fn take_or_deficit(&self) -> Option<Duration> {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.level >= NANOS_PER_TOKEN {
            state.level -= NANOS_PER_TOKEN;
            return None;
        }

        let deficit = NANOS_PER_TOKEN - state.level;
        let rate = u128::from(self.rate.get());
        // Round up, so that the wait always covers the whole deficit.
        let nanos = deficit.div_ceil(rate);

        Some(Duration::from_nanos(nanos as u64))
    }

    /// Credits the tokens accrued since the last refill, capped at capacity.
    #[inline]
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        state.last_refill = now;

        if state.level >= self.max_level {
            return;
        }

        let accrued = elapsed.as_nanos().saturating_mul(u128::from(self.rate.get()));
        state.level = state.level.saturating_add(accrued).min(self.max_level);
    }
}
