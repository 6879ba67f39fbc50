use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{ready, Context, Poll},
};

use futures::{future::BoxFuture, FutureExt, SinkExt, StreamExt};
use tokio::{
    io::AsyncWrite,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tokio_util::codec::FramedWrite;
use tracing::{debug, trace};

use linerate_bucket::TokenBucket;
use linerate_common::Mode;
use linerate_wire::{strip_timestamp, Codec};

use crate::{DispatchError, DispatchOptions, DispatchStats, LineSource, SuppressionCounter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Servicing lines and ticks.
    Running,
    /// The line source has ended; flushing the sinks before terminating.
    Draining,
    /// Done. Polling again returns `Ready(Ok(()))`.
    Terminated,
}

/// A line that is waiting for a token (delay mode only).
struct PendingAdmission {
    line: String,
    wait: BoxFuture<'static, ()>,
}

/// Forwards lines from a [`LineSource`] to an output sink under a rate cap.
///
/// The dispatcher is a future: it runs until the line source ends, writes a final suppression
/// summary if lines were dropped, and resolves once both sinks are flushed. It selects between
/// three event sources:
///
/// - a new line, which is admitted (emitted with its timestamp stripped) or, over the cap,
///   dropped or delayed depending on the [`Mode`];
/// - a periodic tick, which writes the suppression summary if the bucket is observed full;
/// - the end of the line source.
///
/// In delay mode, a line waiting for a token blocks all other events until it is admitted.
///
/// Summaries go to the `diagnostics` sink, lines to `output`. Every write is flushed before the
/// next event is serviced. A failed write ends the dispatcher with an error.
pub struct Dispatcher<O: AsyncWrite, D: AsyncWrite> {
    /// The dispatcher options.
    options: DispatchOptions,
    /// The current state.
    state: State,
    /// Lines to dispatch.
    source: LineSource,
    /// Admission control, shared with pending delay-mode waits.
    bucket: Arc<TokenBucket>,
    /// Lines dropped since the last summary.
    suppressed: SuppressionCounter,
    /// The "bucket full" check timer.
    tick: Interval,
    /// A line waiting for a token.
    pending: Option<PendingAdmission>,
    /// The line output sink.
    output: FramedWrite<O, Codec>,
    /// The suppression summary sink.
    diagnostics: FramedWrite<D, Codec>,
    /// Whether `output` has unflushed writes.
    should_flush_output: bool,
    /// Whether `diagnostics` has unflushed writes.
    should_flush_diagnostics: bool,
    /// The dispatcher stats.
    stats: Arc<DispatchStats>,
}

impl<O: AsyncWrite, D: AsyncWrite> std::fmt::Debug for Dispatcher<O, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("bucket", &self.bucket)
            .field("suppressed", &self.suppressed)
            .field("pending", &self.pending.as_ref().map(|p| &p.line))
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<O, D> Dispatcher<O, D>
where
    O: AsyncWrite + Unpin,
    D: AsyncWrite + Unpin,
{
    /// Creates a new dispatcher. Must be called from within a Tokio runtime.
    ///
    /// # Panics
    /// Panics if `options.tick_interval` is zero.
    pub fn new(source: LineSource, output: O, diagnostics: D, options: DispatchOptions) -> Self {
        let bucket = Arc::new(TokenBucket::new(options.rate));

        // The first check happens one interval in, not immediately.
        let mut tick = interval_at(Instant::now() + options.tick_interval, options.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(rate = %options.rate, mode = ?options.mode, "Starting dispatcher");

        Self {
            suppressed: SuppressionCounter::new(options.rate),
            options,
            state: State::Running,
            source,
            bucket,
            tick,
            pending: None,
            output: FramedWrite::new(output, Codec::new()),
            diagnostics: FramedWrite::new(diagnostics, Codec::new()),
            should_flush_output: false,
            should_flush_diagnostics: false,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Returns the dispatcher stats. These stay readable after the dispatcher has completed.
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Handles a line from the source.
    fn on_line(&mut self, line: String) -> Result<(), DispatchError> {
        self.stats.increment_received();

        match self.options.mode {
            Mode::Delay => {
                if self.bucket.try_take() {
                    return self.emit(&line);
                }

                trace!("Bucket empty, delaying line");
                let bucket = Arc::clone(&self.bucket);
                self.pending = Some(PendingAdmission {
                    line,
                    wait: async move { bucket.wait_take().await }.boxed(),
                });

                Ok(())
            }
            Mode::Drop => {
                if self.bucket.try_take() {
                    self.emit(&line)?;
                    return self.flush_suppressed();
                }

                trace!("Bucket empty, dropping line");
                self.suppressed.increment();
                self.stats.increment_dropped();

                Ok(())
            }
        }
    }

    /// Writes the line, with its timestamp stripped, to the output.
    fn emit(&mut self, line: &str) -> Result<(), DispatchError> {
        let line = strip_timestamp(line);

        self.output.start_send_unpin(line).map_err(DispatchError::Output)?;
        self.should_flush_output = true;
        self.stats.increment_emitted();

        Ok(())
    }

    /// Writes the suppression summary to the diagnostics, if any lines were dropped.
    fn flush_suppressed(&mut self) -> Result<(), DispatchError> {
        let Some(summary) = self.suppressed.flush_if_nonzero() else {
            return Ok(());
        };

        debug!(suppressed = summary.suppressed(), "Reporting suppressed lines");

        let summary_line = summary.to_string();
        self.diagnostics
            .start_send_unpin(summary_line.as_str())
            .map_err(DispatchError::Diagnostics)?;
        self.should_flush_diagnostics = true;
        self.stats.record_summary(summary.suppressed());

        Ok(())
    }

    /// Flushes both sinks if they have pending writes, then waits until both can accept the
    /// next line. Every event writes at most one item per sink, so after this returns ready
    /// any event can be handled without checking readiness again.
    fn poll_sinks_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), DispatchError>> {
        if self.should_flush_output {
            ready!(self.output.poll_flush_unpin(cx)).map_err(DispatchError::Output)?;
            self.should_flush_output = false;
        }

        if self.should_flush_diagnostics {
            ready!(self.diagnostics.poll_flush_unpin(cx)).map_err(DispatchError::Diagnostics)?;
            self.should_flush_diagnostics = false;
        }

        ready!(self.output.poll_ready_unpin(cx)).map_err(DispatchError::Output)?;
        ready!(self.diagnostics.poll_ready_unpin(cx)).map_err(DispatchError::Diagnostics)?;

        Poll::Ready(Ok(()))
    }
}

impl<O, D> Future for Dispatcher<O, D>
where
    O: AsyncWrite + Unpin,
    D: AsyncWrite + Unpin,
{
    type Output = Result<(), DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            if this.state == State::Terminated {
                return Poll::Ready(Ok(()));
            }

            // Nothing else is serviced until previous writes are out.
            if let Err(e) = ready!(this.poll_sinks_ready(cx)) {
                this.state = State::Terminated;
                return Poll::Ready(Err(e));
            }

            if this.state == State::Draining {
                debug!(
                    received = this.stats.received(),
                    emitted = this.stats.emitted(),
                    dropped = this.stats.dropped(),
                    "Dispatcher finished"
                );
                this.state = State::Terminated;
                return Poll::Ready(Ok(()));
            }

            // A delayed line blocks everything else until it gets its token.
            if let Some(pending) = this.pending.as_mut() {
                ready!(pending.wait.poll_unpin(cx));

                if let Some(PendingAdmission { line, .. }) = this.pending.take() {
                    trace!("Delayed line admitted");
                    if let Err(e) = this.emit(&line) {
                        this.state = State::Terminated;
                        return Poll::Ready(Err(e));
                    }
                }

                continue;
            }

            if this.tick.poll_tick(cx).is_ready() {
                if this.bucket.is_full() {
                    trace!("Bucket full on tick");
                    if let Err(e) = this.flush_suppressed() {
                        this.state = State::Terminated;
                        return Poll::Ready(Err(e));
                    }
                }

                continue;
            }

            match this.source.poll_next_unpin(cx) {
                Poll::Ready(Some(line)) => {
                    if let Err(e) = this.on_line(line) {
                        this.state = State::Terminated;
                        return Poll::Ready(Err(e));
                    }
                }
                Poll::Ready(None) => {
                    debug!("End of input, draining");
                    if let Err(e) = this.flush_suppressed() {
                        this.state = State::Terminated;
                        return Poll::Ready(Err(e));
                    }
                    this.state = State::Draining;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
