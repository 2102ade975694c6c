//! Turns the raw answer body into a paced sequence of cumulative text
//! fragments.
//!
//! The backend flushes coarse chunks, so the decoder re-emits the text
//! one character at a time with a fixed delay in between. Each item is
//! the whole answer so far, never a delta. The sequence ends when the
//! byte stream closes and can't be restarted. Dropping it drops any
//! pending delay along with the underlying connection.
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;

use crate::api::ByteStream;
use crate::core::ClientError;

pub type FragmentStream = BoxStream<'static, Result<String, ClientError>>;

pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(10);

/// Incremental UTF-8 decoding that holds back a multi-byte character
/// split across chunks until the rest of it arrives.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Invalid sequence, replace it and keep going
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        // Incomplete sequence at the end, wait for more
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of input. A character cut off by the end of the
    /// stream decodes as U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StreamDecoder {
    delay: Duration,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_DELAY)
    }
}

impl StreamDecoder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn decode(self, mut bytes: ByteStream) -> FragmentStream {
        let delay = self.delay;

        Box::pin(async_stream::try_stream! {
            let mut decoder = Utf8Decoder::default();
            let mut text = String::new();
            let mut done = false;

            while !done {
                let decoded = match bytes.next().await {
                    Some(chunk) => decoder.push(&chunk?),
                    None => {
                        done = true;
                        decoder.finish()
                    }
                };

                for ch in decoded.chars() {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    text.push(ch);
                    yield text.clone();
                }
            }
        })
    }
}
