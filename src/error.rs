// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for pipe operations. Every failure mode a caller can
// observe is one variant; nothing is retried internally, and no failure
// leaves the pipe state corrupted.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::sink::Sink;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PipeError>;

/// Failure modes surfaced by pipe endpoints.
///
/// `TimedOut` and `Interrupted` stay distinct so a caller can tell a
/// deadline expiry apart from an explicit interrupt request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipeError {
    /// The operation was invoked on an endpoint that is already closed.
    #[error("closed")]
    Closed,

    /// A write-side operation cannot succeed because the read side is
    /// closed; any buffered bytes will never be read.
    #[error("source is closed")]
    SourceClosed,

    /// A blocking wait exceeded the endpoint's deadline.
    #[error("timeout")]
    TimedOut,

    /// The blocked thread was interrupted via an [`Interrupter`].
    ///
    /// [`Interrupter`]: crate::Interrupter
    #[error("interrupted")]
    Interrupted,

    /// A fold was attempted while its preconditions were violated.
    #[error("{0}")]
    IllegalState(&'static str),
}

impl From<PipeError> for io::Error {
    fn from(e: PipeError) -> io::Error {
        let kind = match e {
            PipeError::Closed => io::ErrorKind::NotConnected,
            PipeError::SourceClosed => io::ErrorKind::BrokenPipe,
            PipeError::TimedOut => io::ErrorKind::TimedOut,
            PipeError::Interrupted => io::ErrorKind::Interrupted,
            PipeError::IllegalState(_) => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, e)
    }
}

/// Error returned by [`PipeSource::fold`].
///
/// Fold takes ownership of the destination sink up front; when a
/// precondition check rejects the fold, the destination is handed back
/// here so the caller can keep using it.
///
/// [`PipeSource::fold`]: crate::PipeSource::fold
pub struct FoldError {
    cause: PipeError,
    destination: Box<dyn Sink + Send>,
}

impl FoldError {
    pub(crate) fn new(cause: PipeError, destination: Box<dyn Sink + Send>) -> Self {
        Self { cause, destination }
    }

    /// Why the fold was rejected.
    pub fn cause(&self) -> PipeError {
        self.cause
    }

    /// Recover the rejected destination sink.
    pub fn into_destination(self) -> Box<dyn Sink + Send> {
        self.destination
    }

    /// Split into the failure and the rejected destination.
    pub fn into_parts(self) -> (PipeError, Box<dyn Sink + Send>) {
        (self.cause, self.destination)
    }
}

impl fmt::Debug for FoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoldError")
            .field("cause", &self.cause)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for FoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fold rejected: {}", self.cause)
    }
}

impl std::error::Error for FoldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl From<FoldError> for PipeError {
    fn from(e: FoldError) -> PipeError {
        e.cause
    }
}
