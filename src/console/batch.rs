//! Send/expect batches over a console session.
//!
//! A batch is an ordered list of [`Command`]s. Each command line is written to
//! the console, then the session is read until the command's expected pattern
//! shows up. The text in between becomes that command's [`BatchOutput`].
//!
//! One deadline covers the whole batch. It is also capped by the caller's
//! [`Context`] deadline, and the context's cancellation flag is checked
//! between read slices. There are no retries here; re-trying is the caller's
//! business.

use regex::Regex;
use std::time::{Duration, Instant};

use crate::context::Context;
use crate::error::{CheckupError, Result};
use crate::transport::{ConsoleStream, ConsoleTransport};

/// How long a single `recv` may block before we re-check cancellation.
const READ_SLICE: Duration = Duration::from_millis(100);

/// A command line and the pattern that marks the end of its output.
#[derive(Debug, Clone)]
pub struct Command {
    pub text: String,
    pub expect: Regex,
}

impl Command {
    pub fn new(text: impl Into<String>, expect: Regex) -> Self {
        Self {
            text: text.into(),
            expect,
        }
    }
}

/// Output captured for one command of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutput {
    pub output: String,
}

/// Run `commands` in order on a fresh session to `vm_name`.
///
/// Returns exactly one output per command, in submission order, or an error.
/// A partial list is never returned.
pub fn execute_batch<T: ConsoleTransport>(
    ctx: &Context,
    transport: &T,
    namespace: &str,
    vm_name: &str,
    commands: &[Command],
    timeout: Duration,
) -> Result<Vec<BatchOutput>> {
    if ctx.is_cancelled() {
        return Err(CheckupError::Cancelled);
    }

    let mut stream = transport.open(namespace, vm_name)?;
    let deadline = batch_deadline(ctx, timeout);
    let mut pending = String::new();
    let mut outputs = Vec::with_capacity(commands.len());

    for command in commands {
        stream.send(format!("{}\n", command.text).as_bytes())?;
        let output = expect(ctx, &mut stream, &mut pending, command, deadline, timeout)?;
        outputs.push(BatchOutput { output });
    }

    tracing::debug!(
        vm = vm_name,
        commands = commands.len(),
        "console batch complete"
    );
    Ok(outputs)
}

fn batch_deadline(ctx: &Context, timeout: Duration) -> Instant {
    let own = Instant::now() + timeout;
    match ctx.deadline() {
        Some(parent) if parent < own => parent,
        _ => own,
    }
}

/// Read from `stream` until `command.expect` matches.
///
/// `pending` holds text received but not yet attributed to a command. On
/// success everything up to the end of the match is consumed from it.
fn expect<S: ConsoleStream>(
    ctx: &Context,
    stream: &mut S,
    pending: &mut String,
    command: &Command,
    deadline: Instant,
    timeout: Duration,
) -> Result<String> {
    loop {
        if let Some(m) = command.expect.find(pending) {
            let (start, end) = (m.start(), m.end());
            let output = strip_echo(&pending[..start], &command.text);
            pending.drain(..end);
            return Ok(output);
        }

        if ctx.is_cancelled() {
            return Err(CheckupError::Cancelled);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(CheckupError::TransportTimeout {
                pattern: command.expect.as_str().to_string(),
                timeout,
            });
        }

        if let Some(chunk) = stream.recv(READ_SLICE.min(deadline - now))? {
            pending.push_str(&normalize_newlines(&chunk));
        }
    }
}

/// Serial consoles emit CRLF (and sometimes stray CRs); callers see `\n` only.
fn normalize_newlines(chunk: &str) -> String {
    chunk.replace("\r\n", "\n").replace('\r', "")
}

/// Drop the console's echo of the command line we just sent.
fn strip_echo(raw: &str, sent: &str) -> String {
    let sent = sent.trim_end();
    let trimmed = raw.trim_start_matches([' ', '\n']);
    match trimmed.strip_prefix(sent) {
        Some(rest) => rest.strip_prefix('\n').unwrap_or(rest).to_string(),
        None => raw.to_string(),
    }
}
