//! Cancellation and deadlines for a checkup run.
//!
//! The orchestration layer owns a [`Context`] and hands clones of it down.
//! Every blocking point in the driver (waiting for console output, waiting
//! for the next readiness tick) goes through it, so cancelling wakes the
//! waiter immediately instead of letting it sleep out its timeout.
//!
//! Clones share one cancellation flag. [`Context::with_timeout`] only narrows
//! the deadline; cancelling a derived context cancels the whole run.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Why a context stopped a wait early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Done {
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct Context {
    shared: Arc<(Mutex<bool>, Condvar)>,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            shared: Arc::new((Mutex::new(false), Condvar::new())),
            deadline: None,
        }
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            shared: Arc::clone(&self.shared),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that shares this one's cancellation but has no
    /// deadline, for follow-up work that must run after the deadline passed.
    pub fn without_deadline(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            deadline: None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Cancel this context and every clone of it, waking all sleepers.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.shared;
        let mut cancelled = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.shared;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancellation wins over an expired deadline.
    pub fn done(&self) -> Option<Done> {
        if self.is_cancelled() {
            Some(Done::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Done::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Sleep for `duration`, returning early if the context is cancelled or
    /// its deadline arrives first.
    pub fn sleep(&self, duration: Duration) -> Result<(), Done> {
        let wake = Instant::now() + duration;
        let (until, hits_deadline) = match self.deadline {
            Some(d) if d <= wake => (d, true),
            _ => (wake, false),
        };

        let (lock, cvar) = &*self.shared;
        let mut cancelled = lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *cancelled {
                return Err(Done::Cancelled);
            }
            let now = Instant::now();
            if now >= until {
                break;
            }
            // Spurious wakeups just go around the loop again.
            let (guard, _) = cvar
                .wait_timeout(cancelled, until - now)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }

        if hits_deadline {
            Err(Done::DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}
