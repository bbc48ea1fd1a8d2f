//! Console driver for the KubeVirt DPDK checkup.
//!
//! The checkup runs a TRex traffic generator and a DPDK test application in
//! two VMs and talks to both only through their serial consoles. This crate
//! provides:
//! - `transport` - the console channel seam (`ConsoleTransport`)
//! - `console` - send/expect batches and a `virtctl console` transport
//! - `trex` - TRex console commands, readiness polling, failure diagnostics
//! - `config` / `report` - checkup parameters in, result map out

pub mod config;
pub mod console;
pub mod context;
pub mod error;
pub mod poll;
pub mod report;
pub mod transport;
pub mod trex;

pub use config::{CheckupConfig, MacAddress};
pub use console::{execute_batch, BatchOutput, Command, VirtctlTransport};
pub use context::Context;
pub use error::{CheckupError, ConfigError, Result};
pub use report::{format_results, CheckupResults, CheckupStatus};
pub use transport::{ConsoleStream, ConsoleTransport};
pub use trex::{ConsoleSettings, ReadinessPolicy, ServiceDiagnostics, TrexClient};
