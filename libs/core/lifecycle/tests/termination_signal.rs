//! Delivers real SIGTERMs to the test process, or to a re-executed copy of
//! it when the signal is expected to end the process.
//!
//! Kept in its own test binary so the signal cannot reach unrelated tests.

#![cfg(unix)]

use lifecycle::{FORCED_EXIT_CODE, LifecycleHandle, TerminationSource};
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Set in the re-executed test binary that plays the stuck server.
const STUCK_CHILD_ENV: &str = "LIFECYCLE_STUCK_SHUTDOWN_CHILD";
const READY: &str = "termination-source-ready";
const SHUTTING_DOWN: &str = "termination-source-shutting-down";

#[tokio::test]
async fn test_sigterm_cancels_derived_handle_once() {
    let parent = LifecycleHandle::new();
    let source = TerminationSource::install(&parent).unwrap();

    // SAFETY: sending a signal to our own pid has no memory-safety implications.
    let rc = unsafe { libc::kill(libc::getpid(), libc::SIGTERM) };
    assert_eq!(rc, 0);

    tokio::time::timeout(Duration::from_secs(2), source.handle().cancelled())
        .await
        .expect("SIGTERM did not cancel the handle");

    assert!(source.handle().is_cancelled());
    assert!(!parent.is_cancelled());

    // Repeated cancellation stays a no-op.
    source.handle().cancel();
    assert!(source.handle().is_cancelled());
}

/// Installs a termination source, then never finishes its shutdown.
fn run_stuck_child() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let root = LifecycleHandle::new();
        let source = TerminationSource::install(&root).unwrap();
        println!("{READY}");

        source.handle().cancelled().await;
        println!("{SHUTTING_DOWN}");
        std::future::pending::<()>().await;
    });
}

#[test]
fn test_second_sigterm_forces_exit() {
    if std::env::var_os(STUCK_CHILD_ENV).is_some() {
        run_stuck_child();
        return;
    }

    let mut child = Command::new(std::env::current_exe().unwrap())
        .args(["--exact", "test_second_sigterm_forces_exit", "--nocapture", "--test-threads=1"])
        .env(STUCK_CHILD_ENV, "1")
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let pid = child.id() as libc::pid_t;

    let (lines_tx, lines) = mpsc::channel();
    let stdout = child.stdout.take().unwrap();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });
    let wait_for = |marker: &str| loop {
        let line = lines
            .recv_timeout(Duration::from_secs(10))
            .unwrap_or_else(|_| panic!("child never printed {marker}"));
        if line.trim() == marker {
            break;
        }
    };

    wait_for(READY);
    // SAFETY: signalling a child process we spawned.
    assert_eq!(unsafe { libc::kill(pid, libc::SIGTERM) }, 0);

    wait_for(SHUTTING_DOWN);
    // SAFETY: as above.
    assert_eq!(unsafe { libc::kill(pid, libc::SIGTERM) }, 0);

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if std::time::Instant::now() > deadline {
            child.kill().unwrap();
            panic!("child ignored the second SIGTERM");
        }
        thread::sleep(Duration::from_millis(20));
    };

    assert_eq!(status.code(), Some(FORCED_EXIT_CODE));
}
