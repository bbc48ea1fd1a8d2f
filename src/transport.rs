//! Console transport traits.
//!
//! The console channel to a VM is owned by the orchestration layer and lent to
//! the driver. These traits are the only thing the driver knows about it: open
//! a session for a VM, write bytes, read whatever text has arrived.
//!
//! Pattern matching is not part of the transport. The batch executor runs its
//! own read loop over [`ConsoleStream::recv`] so that timeouts and
//! cancellation are handled in one place.

use std::time::Duration;

use crate::error::Result;

/// Opens serial-console sessions to VMs addressed by namespace and name.
pub trait ConsoleTransport {
    type Stream: ConsoleStream;

    /// Open a session to the serial console of `vm_name` in `namespace`.
    ///
    /// Fails with [`CheckupError::Transport`](crate::CheckupError::Transport)
    /// if the console is unreachable.
    fn open(&self, namespace: &str, vm_name: &str) -> Result<Self::Stream>;
}

/// One open console session. Dropping it closes the session.
pub trait ConsoleStream {
    /// Write `bytes` to the console and flush them.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for the next chunk of console text.
    ///
    /// Returns `Ok(None)` if nothing arrived in time and
    /// [`CheckupError::Transport`](crate::CheckupError::Transport) once the
    /// channel is closed.
    fn recv(&mut self, timeout: Duration) -> Result<Option<String>>;
}
