use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};
use tokio::{io::AsyncRead, sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use linerate_wire::Codec;

use crate::DispatchOptions;

/// A stream of input lines, produced by a separate task.
///
/// The stream ends when the input is exhausted. A read or decode failure also ends the stream;
/// it is logged, but otherwise indistinguishable from a clean end of input.
#[derive(Debug)]
pub struct LineSource {
    /// Lines from the producer task.
    from_producer: ReceiverStream<String>,
    /// The producer task, if this source reads from an [`AsyncRead`].
    producer: Option<JoinHandle<()>>,
}

impl LineSource {
    /// Spawns a task that reads newline-delimited lines from `reader`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<R>(reader: R, options: &DispatchOptions) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (to_source, from_producer) = mpsc::channel(options.buffer_size.max(1));

        let codec = match options.max_line_length {
            Some(max) => Codec::with_max_length(max),
            None => Codec::new(),
        };

        let producer = tokio::spawn(async move {
            let mut lines = FramedRead::new(reader, codec);
            let mut count = 0usize;

            while let Some(item) = lines.next().await {
                match item {
                    Ok(line) => {
                        if to_source.send(line).await.is_err() {
                            debug!(count, "Line source dropped, stopping reader");
                            return;
                        }
                        count += 1;
                    }
                    Err(e) => {
                        warn!(err = ?e, count, "Failed to read input, ending stream");
                        return;
                    }
                }
            }

            debug!(count, "Input closed");
        });

        Self { from_producer: ReceiverStream::new(from_producer), producer: Some(producer) }
    }

    /// Creates a line source fed by the returned sender. The stream ends when every sender has
    /// been dropped.
    pub fn channel(buffer_size: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (tx, Self { from_producer: ReceiverStream::new(rx), producer: None })
    }
}

impl Stream for LineSource {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.from_producer.poll_next_unpin(cx)
    }
}

impl Drop for LineSource {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}
