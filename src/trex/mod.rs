//! TRex traffic generator control over the VM serial console.
//!
//! `TrexClient` drives the TRex VM's shell:
//! - `run_console_command()` - one-shot `trex-console` command, sanitized output
//! - `service_status()` / `service_journal()` - raw systemd status and logs
//! - `wait_for_server_to_be_ready()` - poll `help` until the console answers
//! - `collect_failure_diagnostics()` - status + logs after a readiness timeout
//!
//! All the textual constants the VM image dictates (prompt, install path, unit
//! name) are carried in [`ConsoleSettings`] so a client can be pointed at a
//! differently built image, or at a fake console in tests.

mod diagnostics;
mod readiness;
mod runner;
mod sanitize;

pub use diagnostics::ServiceDiagnostics;
pub use sanitize::{sanitize_console_output, CONSOLE_NOISE};

use regex::Regex;
use std::time::Duration;

use crate::transport::ConsoleTransport;

/// Root shell prompt of the TRex VM image.
pub const SHELL_PROMPT: &str = r"\[root@[^\]]+\]# ";

/// Where the TRex binaries, including `trex-console`, are installed.
pub const BIN_DIRECTORY: &str = "/opt/trex";

/// systemd unit running `t-rex-64` in server mode.
pub const SYSTEMD_UNIT_FILE_NAME: &str = "trex-server.service";

/// Deadline for a single console batch.
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Printed by `trex-console` in answer to `help` once the server is up.
pub const READINESS_MARKER: &str = "Console Commands";

pub const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const READINESS_TIMEOUT: Duration = Duration::from_secs(60);

/// Timing of the readiness poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: READINESS_POLL_INTERVAL,
            timeout: READINESS_TIMEOUT,
        }
    }
}

/// Console conventions of the TRex VM image.
#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    /// Terminates every command's output.
    pub shell_prompt: Regex,
    pub bin_directory: String,
    pub unit_name: String,
    pub batch_timeout: Duration,
    pub readiness: ReadinessPolicy,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            shell_prompt: Regex::new(SHELL_PROMPT).expect("SHELL_PROMPT is a valid regex"),
            bin_directory: BIN_DIRECTORY.to_string(),
            unit_name: SYSTEMD_UNIT_FILE_NAME.to_string(),
            batch_timeout: BATCH_TIMEOUT,
            readiness: ReadinessPolicy::default(),
        }
    }
}

/// Console driver for the TRex VM.
///
/// Borrows the transport for the duration of a checkup run; holds no state
/// between calls beyond its construction-time settings.
pub struct TrexClient<'a, T: ConsoleTransport> {
    transport: &'a T,
    namespace: String,
    verbose: bool,
    settings: ConsoleSettings,
}

impl<'a, T: ConsoleTransport> TrexClient<'a, T> {
    /// Create a client using the stock VM image settings.
    ///
    /// `verbose` enables per-tick readiness notices and failure diagnostics.
    pub fn new(transport: &'a T, namespace: impl Into<String>, verbose: bool) -> Self {
        Self {
            transport,
            namespace: namespace.into(),
            verbose,
            settings: ConsoleSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ConsoleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn settings(&self) -> &ConsoleSettings {
        &self.settings
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
