use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for a dispatcher. These are shared between the dispatcher and its owner.
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Total lines received from the line source
    received: AtomicU64,
    /// Total lines written to the output
    emitted: AtomicU64,
    /// Total lines dropped for exceeding the rate cap
    dropped: AtomicU64,
    /// Total suppression summaries written
    summaries: AtomicU64,
    /// Sum of the suppressed counts over all summaries
    reported: AtomicU64,
}

impl DispatchStats {
    #[inline]
    pub(crate) fn increment_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_summary(&self, suppressed: u64) {
        self.summaries.fetch_add(1, Ordering::Relaxed);
        self.reported.fetch_add(suppressed, Ordering::Relaxed);
    }

    #[inline]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn summaries(&self) -> u64 {
        self.summaries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }
}
