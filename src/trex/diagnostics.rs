//! Service diagnostics gathered when the TRex server never came up.

use serde::Serialize;

use crate::context::Context;
use crate::error::{CheckupError, Result};
use crate::transport::ConsoleTransport;

use super::TrexClient;

/// systemd view of the TRex unit at the time of a readiness timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDiagnostics {
    pub status: String,
    pub journal: String,
}

impl<'a, T: ConsoleTransport> TrexClient<'a, T> {
    /// Fetch the unit status, then its journal lines, and log both as one
    /// record.
    ///
    /// All or nothing: if the status fetch fails the journal is not fetched,
    /// and nothing is logged on any failure.
    pub fn collect_failure_diagnostics(
        &self,
        ctx: &Context,
        vm_name: &str,
    ) -> Result<ServiceDiagnostics> {
        let status = self
            .service_status(ctx, vm_name)
            .map_err(|e| collection_failed("systemctl service status", e))?;
        let journal = self
            .service_journal(ctx, vm_name)
            .map_err(|e| collection_failed("trex.service related journalctl logs", e))?;

        tracing::info!(
            vm = vm_name,
            "timeout waiting for trex-server to be ready\n\
             systemd service status:\n{}\n\
             journalctl logs:\n{}",
            status,
            journal
        );

        Ok(ServiceDiagnostics { status, journal })
    }
}

fn collection_failed(what: &'static str, err: CheckupError) -> CheckupError {
    match err {
        // Cancellation keeps its identity so callers can tell it apart.
        CheckupError::Cancelled => CheckupError::Cancelled,
        other => CheckupError::DiagnosticCollection {
            what,
            source: Box::new(other),
            readiness: None,
        },
    }
}
