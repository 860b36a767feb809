// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Contract for a byte-yielding endpoint.

use crate::buffer::ByteQueue;
use crate::error::Result;

/// An origin that yields a stream of bytes.
///
/// Implemented by [`PipeSource`] (the read end of a pipe) and by
/// [`ByteQueue`] (an in-memory buffer draining itself).
///
/// [`PipeSource`]: crate::PipeSource
pub trait Source {
    /// Move between 1 and `byte_count` bytes into `sink`, returning how
    /// many were moved, or `None` once no more bytes will ever arrive.
    ///
    /// `read` never returns `Some(0)`; `byte_count` must be positive.
    fn read(&mut self, sink: &mut ByteQueue, byte_count: u64) -> Result<Option<u64>>;

    /// Release resources. No further reads are accepted.
    fn close(&mut self) -> Result<()>;
}
