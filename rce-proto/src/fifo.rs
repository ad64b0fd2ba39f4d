//! In-memory byte queue used as the handoff buffer between a stream handler's
//! producer and consumer halves.
//!
//! `MessageFifo` keeps the bytes pushed to it as a sequence of opaque segments
//! rather than copying everything into one contiguous buffer on every `push`. This
//! mirrors the original `MessageFIFO`: insertion order is preserved, but internal
//! chunking is nobody's business but the FIFO's.

use std::collections::VecDeque;

/// An ordered byte queue supporting chunked push/pop with length accounting.
///
/// Accessed only from the transport event thread (or, in the tokio port, only from
/// the single task that owns a given handler); no internal locking is needed.
#[derive(Debug, Default, Clone)]
pub struct MessageFifo {
    segments: VecDeque<Vec<u8>>,
    len: usize,
}

impl MessageFifo {
    pub fn new() -> Self {
        MessageFifo::default()
    }

    /// Appends bytes to the back of the queue. Empty pushes are a no-op.
    pub fn push(&mut self, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return;
        }
        self.len += bytes.len();
        self.segments.push_back(bytes);
    }

    /// Removes and returns up to `limit` bytes from the front of the queue, along
    /// with how many bytes were actually returned (`chunk_len <= limit`). The
    /// remainder of a partially consumed segment stays in place.
    pub fn pop(&mut self, limit: usize) -> (Vec<u8>, usize) {
        let mut out = Vec::with_capacity(limit.min(self.len));

        while out.len() < limit {
            let Some(front) = self.segments.front_mut() else {
                break;
            };

            let take = (limit - out.len()).min(front.len());
            if take == front.len() {
                out.extend_from_slice(front);
                self.segments.pop_front();
            } else {
                out.extend_from_slice(&front[..take]);
                front.drain(..take);
            }
            self.len -= take;
        }

        let taken = out.len();
        (out, taken)
    }

    /// Total number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drains and discards all buffered bytes, returning the number discarded.
    /// Used by `Sink` to keep the stream aligned without retaining the data.
    pub fn clear(&mut self) -> usize {
        let dropped = self.len;
        self.segments.clear();
        self.len = 0;
        dropped
    }

    /// Copies the entire contents into one contiguous buffer. Used once a message is
    /// fully received and about to be handed to a deserializer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for segment in &self.segments {
            out.extend_from_slice(segment);
        }
        out
    }
}

impl From<Vec<u8>> for MessageFifo {
    fn from(bytes: Vec<u8>) -> Self {
        let mut fifo = MessageFifo::new();
        fifo.push(bytes);
        fifo
    }
}
