use std::{io, time::Duration};

use thiserror::Error;

use linerate_common::{Mode, Rate, DEFAULT_TICK_INTERVAL};

mod driver;
pub use driver::Dispatcher;

mod source;
pub use source::LineSource;

mod stats;
pub use stats::DispatchStats;

mod suppress;
pub use suppress::{Summary, SuppressionCounter};

/// The default capacity of the channel between the line source and the dispatcher.
const DEFAULT_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to write to output: {0}")]
    Output(#[source] linerate_wire::Error),
    #[error("Failed to write to diagnostics: {0}")]
    Diagnostics(#[source] linerate_wire::Error),
}

impl DispatchError {
    /// Returns `true` if the error was caused by the reading end of a sink going away.
    pub fn is_broken_pipe(&self) -> bool {
        match self {
            Self::Output(linerate_wire::Error::Io(e))
            | Self::Diagnostics(linerate_wire::Error::Io(e)) => {
                e.kind() == io::ErrorKind::BrokenPipe
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// The rate cap, in lines per second. Also the capacity of the token bucket.
    pub rate: Rate,
    /// What to do with lines that exceed the rate cap.
    pub mode: Mode,
    /// How often to check whether the bucket is full, and flush the suppression summary if so.
    pub tick_interval: Duration,
    /// The number of lines that can be buffered between the line source and the dispatcher.
    pub buffer_size: usize,
    /// The maximum length of an input line in bytes. A longer line ends the stream.
    /// `None` is unbounded.
    pub max_line_length: Option<usize>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            rate: Rate::default(),
            mode: Mode::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_line_length: None,
        }
    }
}

impl From<(Rate, Mode)> for DispatchOptions {
    fn from((rate, mode): (Rate, Mode)) -> Self {
        Self { rate, mode, ..Default::default() }
    }
}

impl DispatchOptions {
    /// Sets the rate cap.
    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = rate;
        self
    }

    /// Sets the admission policy for lines over the cap.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the interval of the "bucket full" check. Panics in [`Dispatcher::new`] if zero.
    pub fn tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Sets the line channel capacity. Values below 1 are treated as 1.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sets the maximum input line length in bytes.
    pub fn max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = Some(max_line_length);
        self
    }
}
