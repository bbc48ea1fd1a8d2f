//! Serial-console command execution.
//!
//! - `execute_batch()` - send command lines and wait for their prompt
//! - `VirtctlTransport` - sessions over `virtctl console`

mod batch;
mod virtctl;

pub use batch::{execute_batch, BatchOutput, Command};
pub use virtctl::{VirtctlSession, VirtctlTransport};
