use bytes::{BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("Line exceeds the maximum length of {0} bytes")]
    LineTooLong(usize),
}

/// A newline-delimited line codec.
///
/// Decoding splits on `\n` and drops a trailing `\r`. Invalid UTF-8 is replaced with
/// `U+FFFD` instead of failing, so a stray binary line does not end the stream. A final line
/// without a terminator is yielded at EOF.
///
/// Encoding appends a single `\n` to every line.
#[derive(Debug, Default)]
pub struct Codec {
    /// The index in the buffer up to which we already know there is no newline.
    next_index: usize,
    /// The maximum length of a line in bytes, excluding the terminator. `None` is unbounded.
    max_length: Option<usize>,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec that fails on lines longer than `max_length` bytes.
    pub fn with_max_length(max_length: usize) -> Self {
        Self { next_index: 0, max_length: Some(max_length) }
    }

    /// Converts the raw line into a string, dropping a trailing carriage return.
    #[inline]
    fn finish_line(&self, mut raw: BytesMut) -> Result<String, Error> {
        if raw.last() == Some(&b'\r') {
            raw.truncate(raw.len() - 1);
        }

        if let Some(max) = self.max_length {
            if raw.len() > max {
                return Err(Error::LineTooLong(max));
            }
        }

        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

impl Decoder for Codec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let read_to = src.len();

        if let Some(offset) = src[self.next_index..read_to].iter().position(|b| *b == b'\n') {
            let newline = self.next_index + offset;
            self.next_index = 0;

            let mut raw = src.split_to(newline + 1);
            raw.truncate(newline);

            return self.finish_line(raw).map(Some);
        }

        // No terminator yet. Don't buffer more than a line's worth (plus a possible `\r`).
        if let Some(max) = self.max_length {
            if read_to > max + 1 {
                return Err(Error::LineTooLong(max));
            }
        }

        self.next_index = read_to;
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        if src.is_empty() {
            return Ok(None);
        }

        self.next_index = 0;
        let raw = src.split_to(src.len());
        self.finish_line(raw).map(Some)
    }
}

impl<'a> Encoder<&'a str> for Codec {
    type Error = Error;

    fn encode(&mut self, line: &'a str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');

        Ok(())
    }
}
