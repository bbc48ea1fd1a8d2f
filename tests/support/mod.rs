//! Scripted serial console for driving the library without a VM.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dpdk_checkup::{
    CheckupError, ConsoleSettings, ConsoleStream, ConsoleTransport, ReadinessPolicy,
};

pub const PROMPT: &str = "[root@trex-traffic-gen ~]# ";

/// What the fake VM does with a command line.
pub enum Reply {
    /// Print this, then the shell prompt.
    Output(String),
    /// Print nothing, ever.
    Silence,
    /// Drop the console connection.
    Disconnect,
}

impl Reply {
    pub fn output(s: impl Into<String>) -> Self {
        Reply::Output(s.into())
    }
}

type Responder = Box<dyn FnMut(&str) -> Reply + Send>;

struct State {
    responder: Responder,
    sent: Vec<String>,
    opened: Vec<(String, String)>,
}

/// Fake transport. Every command line sent is recorded and answered by the
/// responder closure; replies are echoed the way a real tty would.
#[derive(Clone)]
pub struct FakeConsole {
    state: Arc<Mutex<State>>,
}

impl FakeConsole {
    pub fn new(responder: impl FnMut(&str) -> Reply + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                responder: Box::new(responder),
                sent: Vec::new(),
                opened: Vec::new(),
            })),
        }
    }

    /// Command lines sent so far, without their trailing newline.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_matching(&self, needle: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|line| line.contains(needle))
            .collect()
    }

    /// (namespace, vm) of every session opened.
    pub fn opened(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().opened.clone()
    }
}

impl ConsoleTransport for FakeConsole {
    type Stream = FakeSession;

    fn open(&self, namespace: &str, vm_name: &str) -> dpdk_checkup::Result<FakeSession> {
        self.state
            .lock()
            .unwrap()
            .opened
            .push((namespace.to_string(), vm_name.to_string()));
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            queue: VecDeque::new(),
            closed: false,
        })
    }
}

pub struct FakeSession {
    state: Arc<Mutex<State>>,
    queue: VecDeque<String>,
    closed: bool,
}

impl ConsoleStream for FakeSession {
    fn send(&mut self, bytes: &[u8]) -> dpdk_checkup::Result<()> {
        if self.closed {
            return Err(CheckupError::Transport("fake console closed".into()));
        }
        let line = String::from_utf8_lossy(bytes).trim_end_matches('\n').to_string();
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.sent.push(line.clone());
            (state.responder)(&line)
        };

        match reply {
            Reply::Output(text) => {
                self.queue.push_back(format!("{}\r\n", line));
                self.queue.push_back(text.replace('\n', "\r\n"));
                self.queue.push_back(PROMPT.to_string());
            }
            Reply::Silence => {}
            Reply::Disconnect => self.closed = true,
        }
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> dpdk_checkup::Result<Option<String>> {
        if let Some(chunk) = self.queue.pop_front() {
            return Ok(Some(chunk));
        }
        if self.closed {
            return Err(CheckupError::Transport("fake console closed".into()));
        }
        std::thread::sleep(timeout);
        Ok(None)
    }
}

/// Stock settings with timings shrunk for tests.
pub fn fast_settings(
    batch_timeout: Duration,
    interval: Duration,
    timeout: Duration,
) -> ConsoleSettings {
    ConsoleSettings {
        batch_timeout,
        readiness: ReadinessPolicy { interval, timeout },
        ..ConsoleSettings::default()
    }
}
