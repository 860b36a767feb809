// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Bounded single-producer / single-consumer byte pipe.
//
// One monitor (mutex) and one condition per pipe. Both endpoints block on
// the same condition and every state mutation notifies all waiters before
// the monitor is released: a writer waiting for space must wake when the
// reader closes, and a reader waiting for bytes must wake when the writer
// closes, so a single broadcast condition covers every transition. At most
// one thread can be parked per side, so the broadcast cost is constant.

use std::io;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::buffer::ByteQueue;
use crate::deadline::{Deadline, WaitOutcome};
use crate::error::{FoldError, PipeError, Result};
use crate::sink::Sink;
use crate::source::Source;

/// Create a pipe that buffers at most `capacity` bytes between the
/// returned write end and read end.
///
/// # Panics
/// Panics if `capacity` is zero.
pub fn pipe(capacity: u64) -> (PipeSink, PipeSource) {
    assert!(capacity > 0, "capacity must be positive");
    let shared = Arc::new(PipeShared {
        capacity,
        state: Mutex::new(PipeState {
            buffer: ByteQueue::new(),
            sink_closed: false,
            source_closed: false,
            folded: None,
        }),
        cond: Condvar::new(),
    });
    let sink = PipeSink {
        shared: Arc::clone(&shared),
        deadline: Deadline::new(),
        closed: false,
    };
    let source = PipeSource {
        shared,
        deadline: Deadline::new(),
        closed: false,
    };
    (sink, source)
}

// All fields are read and written under `PipeShared::state` only.
struct PipeState {
    buffer: ByteQueue,
    sink_closed: bool,
    source_closed: bool,
    // Once set, the read side is spent and writes forward here. The box is
    // taken out of the state while a forward call runs outside the monitor
    // and put back afterwards; only the writer thread does this, so no one
    // can observe the gap.
    folded: Option<Box<dyn Sink + Send>>,
}

struct PipeShared {
    capacity: u64,
    state: Mutex<PipeState>,
    cond: Condvar,
}

// ---------------------------------------------------------------------------
// PipeSink — write end
// ---------------------------------------------------------------------------

/// The write end of a pipe.
///
/// `write` blocks while the buffer is full, bounded by this endpoint's
/// [`Deadline`]. Exactly one thread may use the sink at a time.
pub struct PipeSink {
    shared: Arc<PipeShared>,
    deadline: Deadline,
    closed: bool,
}

impl PipeSink {
    /// Move exactly `byte_count` bytes from `source` into the pipe.
    ///
    /// Blocks whenever the buffer is full, until the reader drains it, the
    /// reader closes (fails with [`PipeError::SourceClosed`]), the deadline
    /// passes ([`PipeError::TimedOut`]) or an interrupt is raised
    /// ([`PipeError::Interrupted`]). On failure, the prefix transferred so
    /// far stays readable; `source` retains the rest.
    ///
    /// # Panics
    /// Panics if `source` holds fewer than `byte_count` bytes.
    pub fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<()> {
        if self.closed {
            return Err(PipeError::Closed);
        }
        assert!(
            byte_count <= source.len(),
            "byte_count {byte_count} exceeds source size {}",
            source.len()
        );

        let mut remaining = byte_count;
        let delegate = {
            let mut state = self.shared.state.lock();
            loop {
                if remaining == 0 {
                    break None;
                }
                // A fold installed while we were blocked re-targets the
                // rest of this write; the forward runs outside the monitor.
                if state.folded.is_some() {
                    break state.folded.take();
                }
                if state.source_closed {
                    return Err(PipeError::SourceClosed);
                }
                let available = self.shared.capacity - state.buffer.len();
                if available == 0 {
                    match self.deadline.wait(&self.shared.cond, &mut state) {
                        WaitOutcome::Signaled => continue,
                        WaitOutcome::Elapsed => {
                            debug!(remaining, "write timed out waiting for space");
                            return Err(PipeError::TimedOut);
                        }
                        WaitOutcome::Interrupted => return Err(PipeError::Interrupted),
                    }
                }
                let n = remaining.min(available);
                state.buffer.transfer_from(source, n);
                remaining -= n;
                self.shared.cond.notify_all();
            }
        };

        if let Some(mut destination) = delegate {
            let result = destination.write(source, remaining);
            self.shared.state.lock().folded = Some(destination);
            return result;
        }
        Ok(())
    }

    /// Make previously written bytes observable downstream.
    ///
    /// Bytes in an in-memory pipe are observable as soon as `write`
    /// returns, so this only surfaces the loss condition: it fails with
    /// [`PipeError::SourceClosed`] if the reader is gone while bytes are
    /// still buffered. It never waits for the reader to drain.
    pub fn flush(&mut self) -> Result<()> {
        if self.closed {
            return Err(PipeError::Closed);
        }
        let delegate = {
            let mut state = self.shared.state.lock();
            if state.folded.is_some() {
                state.folded.take()
            } else {
                if state.source_closed && !state.buffer.is_empty() {
                    return Err(PipeError::SourceClosed);
                }
                None
            }
        };
        if let Some(mut destination) = delegate {
            let result = destination.flush();
            self.shared.state.lock().folded = Some(destination);
            return result;
        }
        Ok(())
    }

    /// Close the write end. Idempotent.
    ///
    /// Buffered bytes remain readable; the reader sees end-of-stream once
    /// it drains them. Fails with [`PipeError::SourceClosed`] if the
    /// reader is already gone while bytes are still buffered (they would
    /// be silently lost); the sink stays open in that case.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let delegate = {
            let mut state = self.shared.state.lock();
            if state.sink_closed {
                self.closed = true;
                return Ok(());
            }
            if state.folded.is_some() {
                state.folded.take()
            } else {
                if state.source_closed && !state.buffer.is_empty() {
                    return Err(PipeError::SourceClosed);
                }
                state.sink_closed = true;
                trace!(buffered = state.buffer.len(), "sink closed");
                self.shared.cond.notify_all();
                None
            }
        };
        if let Some(mut destination) = delegate {
            let result = destination.close();
            self.shared.state.lock().folded = Some(destination);
            result?;
        }
        self.closed = true;
        Ok(())
    }

    /// The buffer capacity this pipe was created with.
    pub fn capacity(&self) -> u64 {
        self.shared.capacity
    }

    /// The deadline bounding this endpoint's blocking writes.
    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Mutable access to the deadline, for setting bounds.
    pub fn deadline_mut(&mut self) -> &mut Deadline {
        &mut self.deadline
    }

    /// A handle that can abort this endpoint's blocking writes from
    /// another thread.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            flag: self.deadline.interrupt_flag(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Sink for PipeSink {
    fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<()> {
        PipeSink::write(self, source, byte_count)
    }

    fn flush(&mut self) -> Result<()> {
        PipeSink::flush(self)
    }

    fn close(&mut self) -> Result<()> {
        PipeSink::close(self)
    }
}

impl io::Write for PipeSink {
    /// Never partial: the whole slice is moved into the pipe, or the call
    /// fails.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut queue = ByteQueue::from(buf);
        PipeSink::write(self, &mut queue, buf.len() as u64)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        PipeSink::flush(self).map_err(io::Error::from)
    }
}

impl Drop for PipeSink {
    // Best-effort close so an abandoned sink does not leave the reader
    // blocked forever. A folded destination is not closed here: its close
    // may block, which a destructor must not do.
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let mut state = self.shared.state.lock();
        if !state.sink_closed {
            state.sink_closed = true;
            self.shared.cond.notify_all();
        }
    }
}

// ---------------------------------------------------------------------------
// PipeSource — read end
// ---------------------------------------------------------------------------

/// The read end of a pipe.
///
/// `read` blocks while the buffer is empty and the writer is still open,
/// bounded by this endpoint's [`Deadline`]. Exactly one thread may use
/// the source at a time.
pub struct PipeSource {
    shared: Arc<PipeShared>,
    deadline: Deadline,
    closed: bool,
}

impl PipeSource {
    /// Move between 1 and `byte_count` buffered bytes into `sink`.
    ///
    /// Returns `Some(n)` with the transfer count, or `None` once the
    /// writer has closed and the buffer is drained. Blocks while the
    /// buffer is empty and the writer is open, until the deadline passes
    /// ([`PipeError::TimedOut`]) or an interrupt is raised
    /// ([`PipeError::Interrupted`]).
    ///
    /// # Panics
    /// Panics if `byte_count` is zero.
    pub fn read(&mut self, sink: &mut ByteQueue, byte_count: u64) -> Result<Option<u64>> {
        if self.closed {
            return Err(PipeError::Closed);
        }
        assert!(byte_count > 0, "byte_count == 0");

        let mut state = self.shared.state.lock();
        loop {
            if !state.buffer.is_empty() {
                let n = byte_count.min(state.buffer.len());
                sink.transfer_from(&mut state.buffer, n);
                self.shared.cond.notify_all();
                return Ok(Some(n));
            }
            if state.sink_closed {
                return Ok(None);
            }
            match self.deadline.wait(&self.shared.cond, &mut state) {
                WaitOutcome::Signaled => continue,
                WaitOutcome::Elapsed => {
                    debug!("read timed out waiting for bytes");
                    return Err(PipeError::TimedOut);
                }
                WaitOutcome::Interrupted => return Err(PipeError::Interrupted),
            }
        }
    }

    /// Close the read end. Idempotent, never fails.
    ///
    /// Buffered bytes are discarded: nothing is silently delivered after a
    /// read-side close. A writer blocked on a full buffer wakes and fails
    /// with [`PipeError::SourceClosed`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        {
            let mut state = self.shared.state.lock();
            state.source_closed = true;
            trace!(discarded = state.buffer.len(), "source closed");
            state.buffer.clear();
            self.shared.cond.notify_all();
        }
        self.closed = true;
        Ok(())
    }

    /// Divert all future bytes written to this pipe's sink into
    /// `destination`, turning the pipe into a transparent conduit.
    ///
    /// Permitted only while the pipe's buffer is empty, both endpoints are
    /// open, and no fold is already in place; any violation fails with
    /// [`PipeError::IllegalState`] and hands `destination` back inside the
    /// [`FoldError`]. On success this source is spent: a writer blocked in
    /// `write` wakes and forwards the rest of its bytes to `destination`,
    /// and the sink's `flush`/`close` delegate to it from then on.
    /// Forward calls run outside the pipe monitor, so a slow destination
    /// never stalls unrelated state transitions.
    pub fn fold(&mut self, destination: Box<dyn Sink + Send>) -> std::result::Result<(), FoldError> {
        {
            let mut state = self.shared.state.lock();
            if state.folded.is_some() {
                return Err(FoldError::new(
                    PipeError::IllegalState("sink already folded"),
                    destination,
                ));
            }
            if state.sink_closed {
                return Err(FoldError::new(
                    PipeError::IllegalState("sink is closed"),
                    destination,
                ));
            }
            if self.closed || state.source_closed {
                return Err(FoldError::new(
                    PipeError::IllegalState("source is closed"),
                    destination,
                ));
            }
            if !state.buffer.is_empty() {
                return Err(FoldError::new(
                    PipeError::IllegalState("pipe buffer is not empty"),
                    destination,
                ));
            }
            state.source_closed = true;
            state.folded = Some(destination);
            self.shared.cond.notify_all();
        }
        self.closed = true;
        debug!("source folded into downstream sink");
        Ok(())
    }

    /// The buffer capacity this pipe was created with.
    pub fn capacity(&self) -> u64 {
        self.shared.capacity
    }

    /// The deadline bounding this endpoint's blocking reads.
    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Mutable access to the deadline, for setting bounds.
    pub fn deadline_mut(&mut self) -> &mut Deadline {
        &mut self.deadline
    }

    /// A handle that can abort this endpoint's blocking reads from
    /// another thread.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            flag: self.deadline.interrupt_flag(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Source for PipeSource {
    fn read(&mut self, sink: &mut ByteQueue, byte_count: u64) -> Result<Option<u64>> {
        PipeSource::read(self, sink, byte_count)
    }

    fn close(&mut self) -> Result<()> {
        PipeSource::close(self)
    }
}

impl io::Read for PipeSource {
    /// `Ok(0)` means end-of-stream, per the `io::Read` contract.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut queue = ByteQueue::new();
        match PipeSource::read(self, &mut queue, buf.len() as u64)? {
            None => Ok(0),
            Some(n) => {
                let copied = queue.read_into(buf);
                debug_assert_eq!(copied as u64, n);
                Ok(copied)
            }
        }
    }
}

impl Drop for PipeSource {
    // Best-effort close so an abandoned source does not leave the writer
    // blocked forever.
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let mut state = self.shared.state.lock();
        state.source_closed = true;
        state.buffer.clear();
        self.shared.cond.notify_all();
    }
}

// ---------------------------------------------------------------------------
// Interrupter
// ---------------------------------------------------------------------------

/// Aborts one endpoint's blocking call from another thread.
///
/// Obtained from [`PipeSink::interrupter`] or [`PipeSource::interrupter`]
/// before handing the endpoint to its worker thread. The interrupted call
/// fails with [`PipeError::Interrupted`]; the endpoint itself stays usable.
#[derive(Clone)]
pub struct Interrupter {
    flag: crate::deadline::InterruptFlag,
    shared: Arc<PipeShared>,
}

impl Interrupter {
    /// Raise the interrupt flag and wake the pipe's waiters.
    pub fn interrupt(&self) {
        self.flag.raise();
        // Barrier: briefly acquire the monitor so a waiter that has
        // checked the flag but not yet parked cannot miss the wakeup.
        drop(self.shared.state.lock());
        self.shared.cond.notify_all();
        debug!("pipe endpoint interrupted");
    }
}
