//! Ctrl-C during a running stage.
#![cfg(unix)]

mod common;

use common::{stderr, TestWorkspace, CONFIG};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn interrupt_during_stage_exits_with_status_one() {
    let workspace = TestWorkspace::new();
    workspace.write("download_full_book.py", "echo started > started.txt\nsleep 10\n");

    let child = workspace.spawn(&["B0TEST", "--config", CONFIG]);

    let deadline = Instant::now() + Duration::from_secs(20);
    while !workspace.path("started.txt").exists() {
        assert!(Instant::now() < deadline, "download stage never started");
        thread::sleep(Duration::from_millis(20));
    }

    let pid = libc::pid_t::try_from(child.id()).expect("pid fits pid_t");
    // SAFETY: signalling a child process we spawned and still own.
    let sent = unsafe { libc::kill(pid, libc::SIGINT) };
    assert_eq!(sent, 0, "kill failed");

    let output = child.wait_with_output().expect("wait for kpipe");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("processing interrupted by user"));
    assert!(!workspace.path("decoded_book.epub").exists());
}
