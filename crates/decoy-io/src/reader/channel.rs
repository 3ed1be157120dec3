//! Byte-stream adapter over a channel of string messages.

use std::io::{self, Read};

use tokio::sync::mpsc;

/// Adapts a [`mpsc::Receiver`] of strings into a blocking byte reader.
///
/// Reads serve the not-yet-consumed remainder of the last received message
/// first; a read that can produce at least one byte returns immediately,
/// even with buffer capacity to spare, rather than waiting for another
/// message. Only a read with nothing in hand blocks on the channel. Once
/// every sender is dropped and the buffered messages are drained, reads
/// report end-of-stream permanently.
///
/// The channel bridge uses [`mpsc::Receiver::blocking_recv`], so `read`
/// must not be called from inside an async context.
#[derive(Debug)]
pub struct ChannelReader {
    source: mpsc::Receiver<String>,
    /// Most recently received, not yet fully consumed message.
    pending: String,
    /// Byte offset into `pending`; never exceeds `pending.len()`.
    offset: usize,
}

impl ChannelReader {
    /// Reader over the receiving half of a string channel.
    ///
    /// The channel stays externally owned: the stream ends when every
    /// sender has been dropped.
    pub fn new(source: mpsc::Receiver<String>) -> Self {
        Self {
            source,
            pending: String::new(),
            offset: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // A zero-length probe returns before touching the channel so it
        // can never block.
        if buf.is_empty() {
            return Ok(0);
        }

        let mut filled = 0;
        loop {
            let pending = self.pending.as_bytes();
            while self.offset < pending.len() && filled < buf.len() {
                buf[filled] = pending[self.offset];
                filled += 1;
                self.offset += 1;
            }

            if filled > 0 {
                return Ok(filled);
            }

            match self.source.blocking_recv() {
                Some(message) => {
                    self.pending = message;
                    self.offset = 0;
                }
                // Channel closed and drained: terminal end-of-stream.
                None => return Ok(0),
            }
        }
    }
}
