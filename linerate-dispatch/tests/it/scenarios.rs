use std::time::Duration;

use tokio::time::Instant;

use linerate_common::{Mode, Rate};
use linerate_dispatch::DispatchOptions;

use crate::common::{sleep_ms, spawn};

fn options(rate: u32, mode: Mode) -> DispatchOptions {
    DispatchOptions::from((Rate::new(rate).unwrap(), mode))
}

/// Rate 2, drop mode, 5 timestamped lines at once.
#[tokio::test(start_paused = true)]
async fn burst_is_capped_and_reported_at_end_of_stream() {
    let mut running = spawn(options(2, Mode::Drop));

    running.write_lines((1..=5).map(|i| format!("2024-01-01 10:00:00.123 hello-{i}"))).await;

    let stats = running.stats.clone();
    let finished = running.finish().await;

    assert_eq!(finished.output_lines(), vec!["hello-1", "hello-2"]);
    assert_eq!(finished.diagnostics, "Rate-limiting to 2 loglines/second. Suppressed 3.\n");
    assert_eq!(stats.received(), 5);
    assert_eq!(stats.emitted(), 2);
    assert_eq!(stats.dropped(), 3);
}

/// Same burst, but the input stays open: the tick reports once the bucket has refilled.
#[tokio::test(start_paused = true)]
async fn burst_is_reported_once_the_bucket_refills() {
    let mut running = spawn(options(2, Mode::Drop));

    running.write_lines((1..=5).map(|i| format!("2024-01-01 10:00:00.123 hello-{i}"))).await;
    assert_eq!(running.stats.summaries(), 0);

    sleep_ms(1050).await;
    assert_eq!(running.stats.summaries(), 1);
    assert_eq!(running.stats.reported(), 3);

    let finished = running.finish().await;
    assert_eq!(finished.output_lines(), vec!["hello-1", "hello-2"]);
    assert_eq!(finished.suppressed_counts(), vec![3]);
}

/// Rate 5, delay mode, 20 plain lines at once.
#[tokio::test(start_paused = true)]
async fn delay_mode_delivers_everything_at_the_rate() {
    let mut running = spawn(options(5, Mode::Delay));
    let lines: Vec<String> = (0..20).map(|i| format!("plain line {i}")).collect();

    let start = Instant::now();
    running.write_lines(&lines).await;
    let finished = running.finish().await;
    let elapsed = start.elapsed();

    // The first 5 go out with the initial burst, the other 15 at 200ms each.
    assert!(elapsed >= Duration::from_secs(3), "drained in {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "drained in {elapsed:?}");
    assert_eq!(finished.output_lines(), lines);
    assert_eq!(finished.diagnostics, "");
}

/// Rate 3, drop mode, one line every 2 seconds.
#[tokio::test(start_paused = true)]
async fn traffic_under_the_cap_is_untouched() {
    let mut running = spawn(options(3, Mode::Drop));

    for i in 0..5 {
        running.write_lines([format!("2024-06-30 23:59:59.999 tick {i}")]).await;
        sleep_ms(2000).await;
    }

    let stats = running.stats.clone();
    let finished = running.finish().await;

    assert_eq!(finished.output_lines(), vec!["tick 0", "tick 1", "tick 2", "tick 3", "tick 4"]);
    assert_eq!(finished.diagnostics, "");
    assert_eq!(stats.dropped(), 0);
    assert_eq!(stats.summaries(), 0);
}

/// Empty input.
#[tokio::test(start_paused = true)]
async fn empty_input_terminates_immediately() {
    let running = spawn(options(5, Mode::Drop));

    let start = Instant::now();
    let stats = running.stats.clone();
    let finished = running.finish().await;

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(finished.output, "");
    assert_eq!(finished.diagnostics, "");
    assert_eq!(stats.received(), 0);
}

#[tokio::test(start_paused = true)]
async fn unterminated_last_line_is_delivered() {
    use tokio::io::AsyncWriteExt;

    let mut running = spawn(options(5, Mode::Drop));
    running.input.write_all(b"2024-01-01 10:00:00 first\r\nno newline").await.unwrap();

    let finished = running.finish().await;
    assert_eq!(finished.output, "first\nno newline\n");
}

#[tokio::test(start_paused = true)]
async fn overlong_line_ends_the_stream_with_a_final_flush() {
    let options = options(1, Mode::Drop).max_line_length(16);
    let mut running = spawn(options);

    let long = "x".repeat(64);
    running.write_lines(["short", "dropped", long.as_str(), "never read"]).await;
    let finished = running.finish().await;

    assert_eq!(finished.output, "short\n");
    assert_eq!(finished.suppressed_counts(), vec![1]);
}
