//! Tests for TRex readiness polling and failure diagnostics.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dpdk_checkup::{CheckupError, Context, TrexClient};
use support::{fast_settings, FakeConsole, Reply};

const READY_OUTPUT: &str = "trex>Global Statistitcs\nConsole Commands\ntrex>";

fn is_probe(line: &str) -> bool {
    line.contains("trex-console")
}

#[test]
fn test_ready_on_first_probe_does_not_wait_for_interval() {
    let console = FakeConsole::new(|_| Reply::output(READY_OUTPUT));
    let settings = fast_settings(
        Duration::from_secs(5),
        Duration::from_secs(10),
        Duration::from_secs(60),
    );
    let client = TrexClient::new(&console, "ns", false).with_settings(settings);

    let start = Instant::now();
    client
        .wait_for_server_to_be_ready(&Context::background(), "trex")
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(console.sent().len(), 1);
}

#[test]
fn test_keeps_probing_until_marker_appears() {
    let probes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&probes);
    let console = FakeConsole::new(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Reply::output("Failed to connect to server\n")
        } else {
            Reply::output(READY_OUTPUT)
        }
    });
    let settings = fast_settings(
        Duration::from_secs(5),
        Duration::from_millis(20),
        Duration::from_secs(10),
    );
    let client = TrexClient::new(&console, "ns", true).with_settings(settings);

    client
        .wait_for_server_to_be_ready(&Context::background(), "trex")
        .unwrap();

    assert_eq!(probes.load(Ordering::SeqCst), 3);
    assert!(console.sent().iter().all(|line| is_probe(line)));
}

#[test]
fn test_times_out_within_one_interval_of_deadline() {
    let console = FakeConsole::new(|_| Reply::output("command not found\n"));
    let interval = Duration::from_millis(50);
    let timeout = Duration::from_millis(300);
    let settings = fast_settings(Duration::from_secs(5), interval, timeout);
    let client = TrexClient::new(&console, "ns", false).with_settings(settings);

    let start = Instant::now();
    let err = client
        .wait_for_server_to_be_ready(&Context::background(), "trex")
        .unwrap_err();
    let elapsed = start.elapsed();

    match &err {
        CheckupError::ReadinessTimeout {
            vm_name,
            timeout: reported,
            diagnostics,
        } => {
            assert_eq!(vm_name, "trex");
            assert_eq!(*reported, timeout);
            assert!(diagnostics.is_none());
        }
        other => panic!("expected ReadinessTimeout, got {:?}", other),
    }
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + interval + Duration::from_millis(500));
    assert!(console.sent().len() > 1);
    assert!(console.sent_matching("systemctl").is_empty());
}

#[test]
fn test_failed_probes_count_as_not_ready() {
    let console = FakeConsole::new(|_| Reply::Silence);
    let settings = fast_settings(
        Duration::from_millis(40),
        Duration::from_millis(20),
        Duration::from_millis(250),
    );
    let client = TrexClient::new(&console, "ns", false).with_settings(settings);

    let err = client
        .wait_for_server_to_be_ready(&Context::background(), "trex")
        .unwrap_err();

    assert!(matches!(err, CheckupError::ReadinessTimeout { .. }));
    assert!(console.sent().len() > 1);
}

#[test]
fn test_verbose_timeout_collects_status_then_journal() {
    let console = FakeConsole::new(|line| {
        if is_probe(line) {
            Reply::output("Failed to connect to server\n")
        } else if line.starts_with("systemctl") {
            Reply::output("Active: activating (auto-restart)\n")
        } else {
            Reply::output("trex-server.service: Main process exited\n")
        }
    });
    let settings = fast_settings(
        Duration::from_secs(5),
        Duration::from_millis(30),
        Duration::from_millis(150),
    );
    let client = TrexClient::new(&console, "ns", true).with_settings(settings);

    let err = client
        .wait_for_server_to_be_ready(&Context::background(), "trex")
        .unwrap_err();

    match err {
        CheckupError::ReadinessTimeout {
            diagnostics: Some(diagnostics),
            ..
        } => {
            assert_eq!(
                diagnostics.status,
                "Active: activating (auto-restart)\n"
            );
            assert_eq!(
                diagnostics.journal,
                "trex-server.service: Main process exited\n"
            );
        }
        other => panic!("expected ReadinessTimeout with diagnostics, got {:?}", other),
    }

    let diagnostic_lines: Vec<String> = console
        .sent()
        .into_iter()
        .filter(|line| !is_probe(line))
        .collect();
    assert_eq!(
        diagnostic_lines,
        vec![
            "systemctl status trex-server.service | cat",
            "journalctl | grep trex-server.service",
        ]
    );
}

#[test]
fn test_status_fetch_failure_skips_journal_and_masks_timeout() {
    let console = FakeConsole::new(|line| {
        if is_probe(line) {
            Reply::output("not ready\n")
        } else {
            Reply::Silence
        }
    });
    let settings = fast_settings(
        Duration::from_millis(100),
        Duration::from_millis(30),
        Duration::from_millis(150),
    );
    let client = TrexClient::new(&console, "ns", true).with_settings(settings);

    let err = client
        .wait_for_server_to_be_ready(&Context::background(), "trex")
        .unwrap_err();

    match &err {
        CheckupError::DiagnosticCollection {
            what,
            source,
            readiness,
        } => {
            assert!(what.contains("systemctl"));
            assert!(matches!(**source, CheckupError::TransportTimeout { .. }));
            assert!(matches!(
                readiness.as_deref(),
                Some(CheckupError::ReadinessTimeout { .. })
            ));
        }
        other => panic!("expected DiagnosticCollection, got {:?}", other),
    }
    assert!(err.is_readiness_timeout());
    assert_eq!(console.sent_matching("systemctl").len(), 1);
    assert!(console.sent_matching("journalctl").is_empty());
}

#[test]
fn test_journal_fetch_failure_is_reported() {
    let console = FakeConsole::new(|line| {
        if is_probe(line) {
            Reply::output("not ready\n")
        } else if line.starts_with("systemctl") {
            Reply::output("Active: failed\n")
        } else {
            Reply::Disconnect
        }
    });
    let settings = fast_settings(
        Duration::from_secs(5),
        Duration::from_millis(30),
        Duration::from_millis(150),
    );
    let client = TrexClient::new(&console, "ns", true).with_settings(settings);

    let err = client
        .wait_for_server_to_be_ready(&Context::background(), "trex")
        .unwrap_err();

    match err {
        CheckupError::DiagnosticCollection { what, source, .. } => {
            assert!(what.contains("journalctl"));
            assert!(matches!(*source, CheckupError::Transport(_)));
        }
        other => panic!("expected DiagnosticCollection, got {:?}", other),
    }
}

#[test]
fn test_cancel_during_probe_aborts_promptly() {
    let console = FakeConsole::new(|_| Reply::Silence);
    let settings = fast_settings(
        Duration::from_secs(30),
        Duration::from_secs(5),
        Duration::from_secs(60),
    );
    let client = TrexClient::new(&console, "ns", true).with_settings(settings);
    let ctx = Context::background();
    let canceller = ctx.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        canceller.cancel();
    });

    let start = Instant::now();
    let err = client
        .wait_for_server_to_be_ready(&ctx, "trex")
        .unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, CheckupError::Cancelled));
    assert!(!err.is_readiness_timeout());
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(console.sent_matching("systemctl").is_empty());
}

#[test]
fn test_cancel_between_probes_aborts_promptly() {
    let console = FakeConsole::new(|_| Reply::output("not ready\n"));
    let settings = fast_settings(
        Duration::from_secs(5),
        Duration::from_secs(5),
        Duration::from_secs(60),
    );
    let client = TrexClient::new(&console, "ns", false).with_settings(settings);
    let ctx = Context::background();
    let canceller = ctx.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        canceller.cancel();
    });

    let start = Instant::now();
    let err = client
        .wait_for_server_to_be_ready(&ctx, "trex")
        .unwrap_err();
    handle.join().unwrap();

    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(console.sent().len(), 1);
}

#[test]
fn test_caller_deadline_still_collects_diagnostics() {
    let console = FakeConsole::new(|line| {
        if is_probe(line) {
            Reply::output("Failed to connect to server\n")
        } else if line.starts_with("systemctl") {
            Reply::output("Active: activating (auto-restart)\n")
        } else {
            Reply::output("trex-server.service: Main process exited\n")
        }
    });
    let settings = fast_settings(
        Duration::from_secs(5),
        Duration::from_millis(30),
        Duration::from_secs(60),
    );
    let client = TrexClient::new(&console, "ns", true).with_settings(settings);
    let ctx = Context::background().with_timeout(Duration::from_millis(150));

    let start = Instant::now();
    let err = client
        .wait_for_server_to_be_ready(&ctx, "trex")
        .unwrap_err();

    match err {
        CheckupError::ReadinessTimeout {
            diagnostics: Some(diagnostics),
            ..
        } => {
            assert_eq!(
                diagnostics.status,
                "Active: activating (auto-restart)\n"
            );
            assert_eq!(
                diagnostics.journal,
                "trex-server.service: Main process exited\n"
            );
        }
        other => panic!("expected ReadinessTimeout with diagnostics, got {:?}", other),
    }
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(console.sent_matching("systemctl").len(), 1);
    assert_eq!(console.sent_matching("journalctl").len(), 1);
}
