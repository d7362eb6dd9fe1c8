//! Lifecycle specs
//!
//! Verify exit codes, stop requests and launch failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::prelude::*;

/// Whether `pid` names a live (non-zombie) process.
fn alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !stat.rsplit(')').next().is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) => false,
    }
}

async fn wait_until(max: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + max;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[tokio::test]
async fn exit_codes_are_published() {
    let scripts = Scripts::new();
    for code in [0, 1, 42] {
        let tool = scripts.script(&format!("exit{code}"), &format!("exit {code}"));
        let host = Arc::new(RecordingHost::new());

        let outcome = run(captured(&tool), &host).await.unwrap();

        assert_eq!(outcome, ExitOutcome::Exited { code });
        assert_eq!(host.last_exit_code(), Some(code));
        assert!(host.errors().is_empty());
    }
}

#[tokio::test]
async fn signalled_child_reports_shell_style_code() {
    let scripts = Scripts::new();
    let victim = scripts.script("victim", "kill -9 $$");
    let host = Arc::new(RecordingHost::new());

    let outcome = run(captured(&victim), &host).await.unwrap();

    assert_eq!(outcome.code(), Some(137));
}

#[tokio::test]
async fn non_zero_exit_becomes_error_when_preferred() {
    let scripts = Scripts::new();
    let failing = scripts.script("failing", "echo partial; exit 7");
    let host = Arc::new(RecordingHost::new());
    let prefs = Preferences::default().native_error_action(true);

    NativeCommand::new(captured(&failing), Arc::clone(&host) as Arc<dyn Host>, posix(), prefs)
        .run(Vec::<Value>::new())
        .await
        .unwrap();

    assert_eq!(host.texts_on(StreamKind::Output)[0], "partial");
    let errors = host.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("non-zero exit code: 7"), "message: {}", errors[0].message);
    assert_eq!(errors[0].target.as_deref(), Some("failing"));
    assert_eq!(host.count(&HostCall::ExecutionFailed), 1);
}

#[tokio::test]
async fn server_side_stop_kills_the_process_tree() {
    let scripts = Scripts::new();
    let parent = scripts.script("parent", "sleep 30 &\necho $!\nwait");
    let host = Arc::new(RecordingHost::new());
    let context = ExecutionContext { server_side: true, ..posix() };
    init_tracing();
    let mut cmd = NativeCommand::new(
        captured(&parent),
        Arc::clone(&host) as Arc<dyn Host>,
        context,
        Preferences::default(),
    );
    cmd.begin().await.unwrap();
    let parent_pid = cmd.pid().unwrap();

    let reported = wait_until(Duration::from_secs(5), || {
        cmd.consume_available().unwrap();
        !host.texts_on(StreamKind::Output).is_empty()
    })
    .await;
    assert!(reported, "child pid was never printed");
    let child_pid: u32 = host.texts_on(StreamKind::Output)[0].parse().unwrap();

    cmd.stop_handle().stop();
    assert!(matches!(cmd.end().await, Err(ExecError::Stopped)));

    assert!(wait_until(Duration::from_secs(5), || !alive(child_pid)).await, "sleep survived");
    assert!(wait_until(Duration::from_secs(5), || !alive(parent_pid)).await, "sh survived");
}

#[tokio::test]
async fn stop_during_drain_returns_promptly() {
    let scripts = Scripts::new();
    let slow = scripts.script("slow", "exec sleep 30");
    let host = Arc::new(RecordingHost::new());
    let mut cmd = native(captured(&slow), &host);
    cmd.begin().await.unwrap();

    let stop = cmd.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.stop();
    });
    let result = tokio::time::timeout(Duration::from_secs(5), cmd.end()).await.unwrap();

    assert!(matches!(result, Err(ExecError::Stopped)));
    assert_eq!(host.last_exit_code(), None);
}

#[tokio::test]
async fn missing_program_fails_with_position() {
    let scripts = Scripts::new();
    let missing = scripts.path().join("does-not-exist");
    let host = Arc::new(RecordingHost::new());

    let err = run(captured(&missing), &host).await.unwrap_err();

    assert!(matches!(err, ExecError::LaunchFailed { .. }), "got {err:?}");
    assert!(err.source_position().is_some());
    assert!(err.to_string().contains("does-not-exist"), "message: {err}");
}
