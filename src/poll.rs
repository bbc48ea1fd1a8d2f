//! Poll a condition until it holds, a deadline passes, or the run is cancelled.
//!
//! The first check runs immediately. After that the poller waits `interval`
//! between checks, and the wait is cut short by cancellation or by the
//! deadline, whichever comes first. The condition receives a context carrying
//! the poll deadline so that a check in flight cannot outlive it.

use std::time::Duration;

use crate::context::{Context, Done};

/// Why polling stopped without the condition holding.
#[derive(Debug)]
pub enum PollError<E> {
    /// The deadline passed.
    TimedOut,
    /// The caller's context was cancelled.
    Cancelled,
    /// The condition itself failed.
    Condition(E),
}

/// Run `condition` now and then every `interval` until it returns `Ok(true)`.
///
/// `timeout` is measured from the call, and never extends a deadline already
/// on `ctx`. An `Err` from the condition stops polling at once.
pub fn poll_immediate_until<E, F>(
    ctx: &Context,
    interval: Duration,
    timeout: Duration,
    mut condition: F,
) -> Result<(), PollError<E>>
where
    F: FnMut(&Context) -> Result<bool, E>,
{
    let poll_ctx = ctx.with_timeout(timeout);

    loop {
        match poll_ctx.done() {
            Some(Done::Cancelled) => return Err(PollError::Cancelled),
            Some(Done::DeadlineExceeded) => return Err(PollError::TimedOut),
            None => {}
        }

        if condition(&poll_ctx).map_err(PollError::Condition)? {
            return Ok(());
        }

        match poll_ctx.sleep(interval) {
            Ok(()) => {}
            Err(Done::Cancelled) => return Err(PollError::Cancelled),
            Err(Done::DeadlineExceeded) => return Err(PollError::TimedOut),
        }
    }
}
