//! Command-line interface.

use clap::Parser;

use linerate_common::{ConfigError, Mode, Rate, DEFAULT_RATE};
use linerate_dispatch::DispatchOptions;

/// Rate-limit log lines from stdin to stdout, stripping leading timestamps.
///
/// Lines over the cap are dropped and counted on stderr, or delayed with `--keep`.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Maximum number of lines per second
    #[arg(short, long, default_value_t = DEFAULT_RATE as i64, allow_negative_numbers = true)]
    pub rate: i64,

    /// Delay lines over the cap instead of dropping them
    #[arg(short, long, default_value_t = false)]
    pub keep: bool,

    /// Filter for internal logs (error, warn, info, debug, trace). `RUST_LOG` takes precedence.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validates the flags into dispatcher options.
    pub fn options(&self) -> Result<DispatchOptions, ConfigError> {
        let rate = Rate::try_from(self.rate)?;
        Ok(DispatchOptions::from((rate, Mode::from_keep(self.keep))))
    }
}
