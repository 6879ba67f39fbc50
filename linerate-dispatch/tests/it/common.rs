use std::time::Duration;

use tokio::{
    io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream},
    task::JoinHandle,
};

use linerate_dispatch::{DispatchError, DispatchOptions, Dispatcher, DispatchStats, LineSource};

const PIPE_SIZE: usize = 1024 * 1024;

/// A dispatcher running on its own task, wired to in-memory pipes.
pub(crate) struct Running {
    pub(crate) input: DuplexStream,
    pub(crate) stats: std::sync::Arc<DispatchStats>,
    task: JoinHandle<Result<(), DispatchError>>,
    output: JoinHandle<String>,
    diagnostics: JoinHandle<String>,
}

/// The captured sinks of a finished dispatcher.
pub(crate) struct Finished {
    pub(crate) output: String,
    pub(crate) diagnostics: String,
}

impl Finished {
    pub(crate) fn output_lines(&self) -> Vec<&str> {
        self.output.lines().collect()
    }

    /// Parses the suppressed counts out of every summary line.
    pub(crate) fn suppressed_counts(&self) -> Vec<u64> {
        self.diagnostics
            .lines()
            .map(|line| {
                let count = line
                    .strip_prefix("Rate-limiting to ")
                    .and_then(|rest| rest.split_once(" loglines/second. Suppressed "))
                    .and_then(|(_, count)| count.strip_suffix('.'))
                    .unwrap_or_else(|| panic!("malformed summary: {line:?}"));
                count.parse().unwrap()
            })
            .collect()
    }
}

fn drain(mut pipe: DuplexStream) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut out = String::new();
        pipe.read_to_string(&mut out).await.unwrap();
        out
    })
}

/// Spawns a dispatcher that reads from the returned input pipe.
pub(crate) fn spawn(options: DispatchOptions) -> Running {
    let _ = tracing_subscriber::fmt::try_init();

    let (input, reader) = duplex(PIPE_SIZE);
    let (output_tx, output_rx) = duplex(PIPE_SIZE);
    let (diagnostics_tx, diagnostics_rx) = duplex(PIPE_SIZE);

    let source = LineSource::spawn(reader, &options);
    let dispatcher = Dispatcher::new(source, output_tx, diagnostics_tx, options);
    let stats = dispatcher.stats();

    Running {
        input,
        stats,
        task: tokio::spawn(dispatcher),
        output: drain(output_rx),
        diagnostics: drain(diagnostics_rx),
    }
}

impl Running {
    /// Writes the given lines to the input, all at once.
    pub(crate) async fn write_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buf = String::new();
        for line in lines {
            buf.push_str(line.as_ref());
            buf.push('\n');
        }
        self.input.write_all(buf.as_bytes()).await.unwrap();
        self.input.flush().await.unwrap();
        // Let the reader and the dispatcher catch up without moving the clock.
        settle().await;
    }

    /// Closes the input and waits for the dispatcher to finish.
    pub(crate) async fn finish(self) -> Finished {
        drop(self.input);
        self.task.await.unwrap().unwrap();

        let output = self.output.await.unwrap();
        let diagnostics = self.diagnostics.await.unwrap();

        Finished { output, diagnostics }
    }
}

/// Yields enough times for spawned tasks to process what is ready.
pub(crate) async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub(crate) async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
