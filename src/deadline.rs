// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-endpoint wait bound consulted at every blocking site. A deadline
// combines an optional per-wait timeout, an optional absolute cutoff, and
// an interrupt flag another thread can raise to abort a wait in progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, MutexGuard};

/// How a bounded wait on a condition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition was signalled (or the wakeup was spurious — callers
    /// re-check their predicate in a loop either way).
    Signaled,
    /// The wait bound passed before a signal arrived.
    Elapsed,
    /// The interrupt flag was raised; the flag has been consumed.
    Interrupted,
}

/// A raisable interrupt flag shared between a [`Deadline`] and any number
/// of handles.
///
/// Raising the flag does not wake a parked waiter by itself; whoever
/// raises it must also notify the condition the waiter is parked on.
/// [`Interrupter`] bundles both steps for pipe endpoints.
///
/// [`Interrupter`]: crate::Interrupter
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Request that the owning endpoint's current (or next) wait abort
    /// with [`WaitOutcome::Interrupted`].
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether an interrupt request is pending.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    // Consume a pending request, if any.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Wait bound owned by one pipe endpoint.
///
/// The bound for each individual wait is the earlier of `now + timeout`
/// and the absolute `deadline`; with neither set, waits are unbounded.
/// The timeout applies per wait, not per operation: a write that blocks
/// three times gets the full timeout three times.
#[derive(Debug, Default)]
pub struct Deadline {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    interrupt: InterruptFlag,
}

impl Deadline {
    /// A deadline with no bounds set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each individual wait to `timeout`.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Remove the per-wait timeout.
    pub fn clear_timeout(&mut self) {
        self.timeout = None;
    }

    /// The per-wait timeout, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Set an absolute point in time after which waits fail.
    pub fn set_deadline(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    /// Remove the absolute deadline.
    pub fn clear_deadline(&mut self) {
        self.deadline = None;
    }

    /// The absolute deadline, if set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// A handle to this deadline's interrupt flag.
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    /// Block on `cond` until signalled, until the wait bound passes, or
    /// until the interrupt flag is raised.
    ///
    /// Performs a single bounded wait; a pending interrupt is consumed
    /// before parking. The caller must hold the monitor via `guard` and
    /// must re-check its predicate after [`WaitOutcome::Signaled`].
    pub fn wait<T>(&self, cond: &Condvar, guard: &mut MutexGuard<'_, T>) -> WaitOutcome {
        if self.interrupt.take() {
            return WaitOutcome::Interrupted;
        }
        match self.bound(Instant::now()) {
            None => {
                cond.wait(guard);
            }
            Some(at) => {
                if at <= Instant::now() {
                    return WaitOutcome::Elapsed;
                }
                if cond.wait_until(guard, at).timed_out() {
                    // An interrupt that races the expiry wins: it is the
                    // more specific disposition.
                    return if self.interrupt.take() {
                        WaitOutcome::Interrupted
                    } else {
                        WaitOutcome::Elapsed
                    };
                }
            }
        }
        if self.interrupt.take() {
            WaitOutcome::Interrupted
        } else {
            WaitOutcome::Signaled
        }
    }

    // Earliest applicable cutoff for a wait starting at `now`.
    fn bound(&self, now: Instant) -> Option<Instant> {
        match (self.timeout, self.deadline) {
            (None, None) => None,
            (Some(t), None) => Some(now + t),
            (None, Some(d)) => Some(d),
            (Some(t), Some(d)) => Some((now + t).min(d)),
        }
    }
}
