// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// In-memory bounded single-producer / single-consumer byte pipe with
// blocking flow control, per-endpoint deadlines, interrupt support, and
// sink folding (reader takeover). Create one with `pipe(capacity)`; the
// write end blocks when the buffer is full, the read end blocks when it
// is empty, and closing either side terminates the counterpart in a
// well-defined way.

pub mod buffer;
pub use buffer::{ByteQueue, SEGMENT_SIZE};

mod deadline;
pub use deadline::{Deadline, InterruptFlag, WaitOutcome};

mod error;
pub use error::{FoldError, PipeError, Result};

mod sink;
pub use sink::Sink;

mod source;
pub use source::Source;

mod pipe;
pub use pipe::{pipe, Interrupter, PipeSink, PipeSource};
