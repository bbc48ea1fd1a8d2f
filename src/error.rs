//! Error types for the checkup console driver.

use std::time::Duration;

use crate::trex::ServiceDiagnostics;

/// Result type alias for console driver operations.
pub type Result<T> = std::result::Result<T, CheckupError>;

/// Errors surfaced by the console driver, the readiness poller and the
/// diagnostic collector.
#[derive(Debug, thiserror::Error)]
pub enum CheckupError {
    /// The console channel is closed or could not be opened. Never retried.
    #[error("console transport error: {0}")]
    Transport(String),

    /// A command's expected pattern was not seen before the batch deadline.
    #[error("timed out after {timeout:?} waiting for console output matching '{pattern}'")]
    TransportTimeout { pattern: String, timeout: Duration },

    /// The TRex console never answered the readiness probe.
    #[error("timeout waiting for trex-server to be ready on '{vm_name}' after {timeout:?}")]
    ReadinessTimeout {
        vm_name: String,
        timeout: Duration,
        /// Service status and logs, when verbose diagnostics were collected.
        diagnostics: Option<ServiceDiagnostics>,
    },

    /// Gathering diagnostics after a readiness timeout failed.
    ///
    /// Replaces the readiness timeout as the surfaced failure; the timeout is
    /// kept in `readiness` so neither is lost.
    #[error("failed gathering {what} after trex-server timeout: {source}")]
    DiagnosticCollection {
        what: &'static str,
        #[source]
        source: Box<CheckupError>,
        readiness: Option<Box<CheckupError>>,
    },

    /// The caller cancelled the run.
    #[error("checkup cancelled")]
    Cancelled,
}

impl CheckupError {
    /// Whether this error came from the caller cancelling the run.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CheckupError::Cancelled)
    }

    /// Whether this is a readiness timeout, either bare or hidden behind a
    /// failed diagnostic collection.
    pub fn is_readiness_timeout(&self) -> bool {
        match self {
            CheckupError::ReadinessTimeout { .. } => true,
            CheckupError::DiagnosticCollection { readiness, .. } => readiness
                .as_deref()
                .is_some_and(CheckupError::is_readiness_timeout),
            _ => false,
        }
    }

    /// Attach the readiness timeout that a diagnostic collection failure
    /// is about to replace. Other errors pass through untouched.
    pub(crate) fn masking(self, timeout: CheckupError) -> CheckupError {
        match self {
            CheckupError::DiagnosticCollection { what, source, .. } => {
                CheckupError::DiagnosticCollection {
                    what,
                    source,
                    readiness: Some(Box::new(timeout)),
                }
            }
            other => other,
        }
    }
}

/// Errors produced while parsing the checkup parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid NUMA socket: '{0}'")]
    InvalidNumaSocket(String),

    #[error("invalid NetworkAttachmentDefinition name: '{0}'")]
    InvalidNetworkAttachmentDefinitionName(String),

    #[error("invalid port bandwidth [GB]: '{0}'")]
    InvalidPortBandwidthGb(String),

    #[error("invalid traffic generator packets per second [millions]: '{0}'")]
    InvalidTrafficGeneratorPacketsPerSecondInMillions(String),

    #[error("invalid traffic generator east MAC address: '{0}'")]
    InvalidTrafficGeneratorEastMacAddress(String),

    #[error("invalid DPDK MAC address: '{0}'")]
    InvalidDpdkMacAddress(String),

    #[error("invalid test duration: '{0}'")]
    InvalidTestDuration(String),

    #[error("failed to parse parameter file: {0}")]
    ParameterFile(String),
}
