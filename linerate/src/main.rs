use std::process;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use linerate::{cli::Cli, Dispatcher, LineSource};

/// Exit status for invalid configuration, the same one `clap` uses for malformed flags.
const EXIT_USAGE: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let options = match cli.options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}");
            process::exit(EXIT_USAGE);
        }
    };

    let source = LineSource::spawn(tokio::io::stdin(), &options);
    let dispatcher = Dispatcher::new(source, tokio::io::stdout(), tokio::io::stderr(), options);

    let code = match dispatcher.await {
        Ok(()) => 0,
        Err(e) if e.is_broken_pipe() => {
            debug!("Output closed, exiting");
            0
        }
        Err(e) => {
            error!(err = ?e, "Dispatcher failed");
            eprintln!("{e}");
            1
        }
    };

    // Stdin is read on a blocking thread that the runtime would otherwise wait for on shutdown.
    process::exit(code);
}
