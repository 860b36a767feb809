// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Contract for a byte-accepting endpoint.

use crate::buffer::ByteQueue;
use crate::error::Result;

/// A destination that accepts a stream of bytes.
///
/// Implemented by [`PipeSink`] (the write end of a pipe) and by
/// [`ByteQueue`] (an in-memory collector). Fold destinations are `Sink`s,
/// so pipes compose: one pipe's sink can be folded behind another pipe's
/// source.
///
/// [`PipeSink`]: crate::PipeSink
pub trait Sink {
    /// Move exactly `byte_count` bytes from the front of `source` into
    /// this sink, or fail having moved some prefix of them.
    fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<()>;

    /// Push any accepted bytes towards their final destination.
    fn flush(&mut self) -> Result<()>;

    /// Release resources. No further writes are accepted.
    fn close(&mut self) -> Result<()>;
}
