// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Segmented FIFO byte container used as the transfer unit between pipe
// endpoints. Bytes live in immutable `bytes::Bytes` segments; moving data
// between two queues relinks segments (refcount bump + split) instead of
// copying payload, so transfers under the pipe monitor are O(segments).

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::Result;
use crate::sink::Sink;
use crate::source::Source;

/// Upper bound on the payload held by a single segment.
///
/// Slices pushed into a queue are chunked to this size so that a transfer
/// never has to split more than one segment per call.
pub const SEGMENT_SIZE: usize = 8192;

/// An owning FIFO queue of bytes, stored as a run of reference-counted
/// segments.
///
/// `ByteQueue` is the currency of this crate: [`PipeSink::write`] consumes
/// bytes from one, [`PipeSource::read`] deposits bytes into one, and the
/// pipe's internal buffer is one. A `ByteQueue` also implements [`Sink`]
/// and [`Source`] itself, so a plain in-memory buffer can stand in for
/// either end of a pipe (for example as a fold destination).
///
/// [`PipeSink::write`]: crate::PipeSink::write
/// [`PipeSource::read`]: crate::PipeSource::read
#[derive(Clone, Default)]
pub struct ByteQueue {
    segments: VecDeque<Bytes>,
    len: u64,
}

impl ByteQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            segments: VecDeque::new(),
            len: 0,
        }
    }

    /// Number of bytes queued.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the queue holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop all queued bytes.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.len = 0;
    }

    /// Append a copy of `data`, chunked to [`SEGMENT_SIZE`] segments.
    pub fn push_slice(&mut self, data: &[u8]) {
        for chunk in data.chunks(SEGMENT_SIZE) {
            self.segments.push_back(Bytes::copy_from_slice(chunk));
            self.len += chunk.len() as u64;
        }
    }

    /// Append an owned segment without copying its payload.
    /// Oversized segments are split at [`SEGMENT_SIZE`] boundaries.
    pub fn push_bytes(&mut self, mut data: Bytes) {
        while data.len() > SEGMENT_SIZE {
            let head = data.split_to(SEGMENT_SIZE);
            self.len += head.len() as u64;
            self.segments.push_back(head);
        }
        if !data.is_empty() {
            self.len += data.len() as u64;
            self.segments.push_back(data);
        }
    }

    /// Move exactly `byte_count` bytes from the front of `source` to the
    /// back of `self`.
    ///
    /// Whole segments are relinked; at most one segment is split. No
    /// payload bytes are copied.
    ///
    /// # Panics
    /// Panics if `source` holds fewer than `byte_count` bytes.
    pub fn transfer_from(&mut self, source: &mut ByteQueue, byte_count: u64) {
        assert!(
            byte_count <= source.len,
            "byte_count {byte_count} exceeds source size {}",
            source.len
        );
        let mut remaining = byte_count;
        while remaining > 0 {
            let front = source
                .segments
                .front_mut()
                .expect("segment accounting out of sync with len");
            let front_len = front.len() as u64;
            if front_len <= remaining {
                let segment = source.segments.pop_front().unwrap();
                source.len -= front_len;
                self.len += front_len;
                self.segments.push_back(segment);
                remaining -= front_len;
            } else {
                let head = front.split_to(remaining as usize);
                source.len -= remaining;
                self.len += remaining;
                self.segments.push_back(head);
                remaining = 0;
            }
        }
    }

    /// Pop up to `dst.len()` bytes from the front, copying them out.
    /// Returns the number of bytes copied.
    pub fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < dst.len() {
            let Some(front) = self.segments.front_mut() else {
                break;
            };
            let n = front.len().min(dst.len() - copied);
            dst[copied..copied + n].copy_from_slice(&front[..n]);
            if n == front.len() {
                self.segments.pop_front();
            } else {
                let _ = front.split_to(n);
            }
            self.len -= n as u64;
            copied += n;
        }
        copied
    }

    /// Copy the queued bytes out without consuming them.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len as usize);
        for segment in &self.segments {
            out.extend_from_slice(segment);
        }
        out
    }
}

impl From<&[u8]> for ByteQueue {
    fn from(data: &[u8]) -> Self {
        let mut queue = ByteQueue::new();
        queue.push_slice(data);
        queue
    }
}

impl From<Vec<u8>> for ByteQueue {
    fn from(data: Vec<u8>) -> Self {
        let mut queue = ByteQueue::new();
        queue.push_bytes(Bytes::from(data));
        queue
    }
}

impl From<&str> for ByteQueue {
    fn from(data: &str) -> Self {
        ByteQueue::from(data.as_bytes())
    }
}

impl PartialEq for ByteQueue {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let a = self.segments.iter().flat_map(|s| s.iter());
        let b = other.segments.iter().flat_map(|s| s.iter());
        a.eq(b)
    }
}

impl Eq for ByteQueue {}

impl std::fmt::Debug for ByteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteQueue")
            .field("len", &self.len)
            .field("segments", &self.segments.len())
            .finish()
    }
}

// A plain buffer can serve as either endpoint of a transfer: writing into
// it queues bytes, reading from it drains them, and both directions reuse
// the segment-relinking transfer above.

impl Sink for ByteQueue {
    fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<()> {
        self.transfer_from(source, byte_count);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Source for ByteQueue {
    fn read(&mut self, sink: &mut ByteQueue, byte_count: u64) -> Result<Option<u64>> {
        assert!(byte_count > 0, "byte_count == 0");
        if self.is_empty() {
            return Ok(None);
        }
        let n = byte_count.min(self.len);
        sink.transfer_from(self, n);
        Ok(Some(n))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
