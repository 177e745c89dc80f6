//! Splitting outbound payloads into transport chunks.

/// One outbound chunk: a borrowed slice and whether it ends the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Chunk bytes.
    pub data: &'a [u8],
    /// `true` on the last chunk of the message.
    pub end_of_message: bool,
}

/// Iterator over the chunks of one payload.
///
/// Every chunk but the last is exactly `chunk_size` bytes. An empty payload
/// yields a single empty final chunk so the peer still sees a message.
pub struct ChunkSplitter<'a> {
    payload: &'a [u8],
    chunk_size: usize,
    offset: usize,
    emitted: bool,
}

impl<'a> ChunkSplitter<'a> {
    /// Create a splitter over `payload`.
    #[inline]
    #[must_use]
    pub fn new(payload: &'a [u8], chunk_size: usize) -> Self {
        Self {
            payload,
            chunk_size: chunk_size.max(1),
            offset: 0,
            emitted: false,
        }
    }

    /// Number of chunks this payload produces.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.payload.len().div_ceil(self.chunk_size).max(1)
    }

    /// Bytes not yet yielded.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.payload.len().saturating_sub(self.offset)
    }
}

impl<'a> Iterator for ChunkSplitter<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.payload.len() {
            if !self.emitted && self.payload.is_empty() {
                self.emitted = true;
                return Some(Chunk {
                    data: &[],
                    end_of_message: true,
                });
            }
            return None;
        }

        let size = self.remaining().min(self.chunk_size);
        let data = &self.payload[self.offset..self.offset + size];
        self.offset += size;
        self.emitted = true;

        Some(Chunk {
            data,
            end_of_message: self.offset >= self.payload.len(),
        })
    }
}
