//! Reassembly of inbound chunks into complete messages.

use bytes::BytesMut;

use crate::error::{Error, Result};
use crate::message::MessageKind;

/// Accumulates received chunks until one ends the message.
///
/// The buffer is cleared in place between messages, so its capacity is
/// reused for the whole connection.
#[derive(Debug)]
pub struct MessageAccumulator {
    buffer: BytesMut,
    chunk_count: usize,
    max_message_size: usize,
}

impl MessageAccumulator {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            chunk_count: 0,
            max_message_size,
        }
    }

    /// Append one chunk.
    ///
    /// Returns `Some(kind)` once `end_of_message` is set; the message bytes
    /// are then available from [`message`](Self::message) until
    /// [`reset`](Self::reset). The final chunk's kind classifies the message.
    pub fn push(
        &mut self,
        data: &[u8],
        kind: MessageKind,
        end_of_message: bool,
    ) -> Result<Option<MessageKind>> {
        let new_size = self.buffer.len() + data.len();
        if new_size > self.max_message_size {
            return Err(Error::MessageTooLarge {
                size: new_size,
                max: self.max_message_size,
            });
        }

        self.buffer.extend_from_slice(data);
        self.chunk_count += 1;

        Ok(end_of_message.then_some(kind))
    }

    /// Bytes accumulated so far.
    pub fn message(&self) -> &[u8] {
        &self.buffer
    }

    /// Chunks pushed since the last reset.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn is_assembling(&self) -> bool {
        self.chunk_count > 0
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.chunk_count = 0;
    }
}
