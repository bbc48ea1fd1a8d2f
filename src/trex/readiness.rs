//! Wait for the TRex server to accept console commands.

use crate::context::Context;
use crate::error::{CheckupError, Result};
use crate::poll::{poll_immediate_until, PollError};
use crate::transport::ConsoleTransport;

use super::{TrexClient, READINESS_MARKER};

impl<'a, T: ConsoleTransport> TrexClient<'a, T> {
    /// Probe the console with `help` until it lists its commands.
    ///
    /// Probes run immediately and then once per poll interval. A failed probe
    /// counts as "not ready yet". Cancelling `ctx` aborts the wait, including
    /// a probe in flight, with [`CheckupError::Cancelled`].
    ///
    /// When the poll deadline passes the result is
    /// [`CheckupError::ReadinessTimeout`], whether it was the poll's own
    /// deadline or an earlier one on `ctx`. With verbose output enabled the
    /// service status and logs are collected first and attached to it; if
    /// that collection fails, its error is returned instead, carrying the
    /// timeout as well.
    pub fn wait_for_server_to_be_ready(&self, ctx: &Context, vm_name: &str) -> Result<()> {
        let policy = self.settings.readiness;

        let probe = |probe_ctx: &Context| -> Result<bool> {
            if self.is_server_running(probe_ctx, vm_name)? {
                tracing::info!(vm = vm_name, "trex-server is now ready");
                return Ok(true);
            }
            if self.verbose {
                tracing::info!(vm = vm_name, "trex-server is not yet ready...");
            }
            Ok(false)
        };
        let polled = poll_immediate_until(ctx, policy.interval, policy.timeout, probe);

        match polled {
            Ok(()) => Ok(()),
            Err(PollError::Cancelled) => Err(CheckupError::Cancelled),
            Err(PollError::Condition(err)) => Err(err),
            Err(PollError::TimedOut) => Err(self.readiness_timeout(ctx, vm_name)),
        }
    }

    fn is_server_running(&self, ctx: &Context, vm_name: &str) -> Result<bool> {
        match self.run_console_command(ctx, vm_name, "help") {
            Ok(output) => Ok(output.contains(READINESS_MARKER)),
            Err(CheckupError::Cancelled) => Err(CheckupError::Cancelled),
            Err(err) => {
                tracing::debug!(vm = vm_name, error = %err, "readiness probe failed");
                Ok(false)
            }
        }
    }

    fn readiness_timeout(&self, ctx: &Context, vm_name: &str) -> CheckupError {
        let timed_out = |diagnostics| CheckupError::ReadinessTimeout {
            vm_name: vm_name.to_string(),
            timeout: self.settings.readiness.timeout,
            diagnostics,
        };

        if !self.verbose {
            return timed_out(None);
        }

        // The deadline that ended the poll may be the caller's own; the
        // fetches still get their batch timeout and stay cancellable.
        match self.collect_failure_diagnostics(&ctx.without_deadline(), vm_name) {
            Ok(diagnostics) => timed_out(Some(diagnostics)),
            Err(err) => err.masking(timed_out(None)),
        }
    }
}
