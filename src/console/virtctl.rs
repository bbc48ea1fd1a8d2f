//! `virtctl console` backed transport.
//!
//! Each session is a `virtctl console` child process with piped stdio. A
//! reader thread forwards stdout to the session over a channel so that reads
//! can time out; the child is killed when the session is dropped.
//!
//! Output is forwarded in raw chunks rather than lines: the shell prompt is
//! not newline terminated, and waiting for a newline after it would hang.
//! Chunks always end on a UTF-8 character boundary.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::error::{CheckupError, Result};
use crate::transport::{ConsoleStream, ConsoleTransport};

/// Opens serial-console sessions by running `virtctl console`.
#[derive(Debug, Clone)]
pub struct VirtctlTransport {
    virtctl: PathBuf,
}

impl Default for VirtctlTransport {
    fn default() -> Self {
        Self::new("virtctl")
    }
}

impl VirtctlTransport {
    pub fn new(virtctl: impl Into<PathBuf>) -> Self {
        Self {
            virtctl: virtctl.into(),
        }
    }
}

impl ConsoleTransport for VirtctlTransport {
    type Stream = VirtctlSession;

    fn open(&self, namespace: &str, vm_name: &str) -> Result<VirtctlSession> {
        let mut child = Command::new(&self.virtctl)
            .args(["console", "--namespace", namespace, vm_name])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CheckupError::Transport(format!(
                    "failed to spawn {} for {}/{}: {}",
                    self.virtctl.display(),
                    namespace,
                    vm_name,
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CheckupError::Transport("failed to get virtctl stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CheckupError::Transport("failed to get virtctl stdout".into()))?;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || reader_thread(stdout, tx));

        tracing::debug!(namespace, vm = vm_name, "opened serial console");
        Ok(VirtctlSession { child, stdin, rx })
    }
}

/// One live `virtctl console` process.
pub struct VirtctlSession {
    child: Child,
    stdin: ChildStdin,
    rx: Receiver<String>,
}

impl ConsoleStream for VirtctlSession {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stdin
            .write_all(bytes)
            .and_then(|()| self.stdin.flush())
            .map_err(|e| CheckupError::Transport(format!("console write failed: {}", e)))
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<String>> {
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(CheckupError::Transport("console disconnected".into()))
            }
        }
    }
}

impl Drop for VirtctlSession {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn reader_thread(mut stdout: ChildStdout, tx: Sender<String>) {
    let mut buf = [0u8; 4096];
    let mut pending = Vec::new();
    loop {
        match stdout.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let chunk = take_utf8(&mut pending);
                if !chunk.is_empty() && tx.send(chunk).is_err() {
                    return;
                }
            }
        }
    }
    if !pending.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&pending).into_owned());
    }
}

/// Decode and remove everything in `pending` except a trailing multi-byte
/// sequence that the next read may complete.
///
/// Bytes that can never be valid UTF-8 become U+FFFD.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                out.push_str(text);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + bad);
                    }
                }
            }
        }
    }
}
