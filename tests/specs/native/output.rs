//! Output specs
//!
//! Verify how stdout and stderr of a child reach the host.

use std::sync::Arc;

use nx_core::ErrorCategory;
use similar_asserts::assert_eq;

use crate::prelude::*;

#[tokio::test]
async fn plain_stdout_line_reaches_host() {
    let scripts = Scripts::new();
    let hello = scripts.script("hello", "echo hello");
    let host = Arc::new(RecordingHost::new());

    let outcome = run(captured(&hello), &host).await.unwrap();

    assert_eq!(outcome, ExitOutcome::Exited { code: 0 });
    assert_eq!(
        host.records(),
        vec![nx_core::ProcessOutputRecord::text(StreamKind::Output, "hello")]
    );
    assert_eq!(host.last_exit_code(), Some(0));
}

#[tokio::test]
async fn protocol_stream_routes_tagged_records() {
    let scripts = Scripts::new();
    let body = format!(
        "printf '%s\\n' '{SENTINEL}' '{}' '{}'",
        tagged("warning", "careful"),
        tagged("output", "result"),
    );
    let tool = scripts.script("tool", &body);
    let host = Arc::new(RecordingHost::new());

    run(captured(&tool), &host).await.unwrap();

    let records = host.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].stream, StreamKind::Warning);
    assert_eq!(records[0].payload.as_text(), Some("careful"));
    assert_eq!(records[1].stream, StreamKind::Output);
    assert_eq!(records[1].payload.as_text(), Some("result"));
}

#[tokio::test]
async fn untagged_documents_use_the_carrying_stream() {
    let scripts = Scripts::new();
    let body = format!(
        "printf '%s\\n' '{SENTINEL}' '{}' >&2",
        format!("{}<S>boom</S>{}", nx_wire::OBJS_OPEN, nx_wire::OBJS_CLOSE),
    );
    let tool = scripts.script("tool", &body);
    let host = Arc::new(RecordingHost::new());

    run(captured(&tool), &host).await.unwrap();

    let errors = host.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "boom");
}

#[tokio::test]
async fn each_stream_keeps_its_own_order() {
    let scripts = Scripts::new();
    let chatty = scripts.script(
        "chatty",
        "i=1\nwhile [ $i -le 200 ]; do echo out$i; echo err$i >&2; i=$((i+1)); done",
    );
    let host = Arc::new(RecordingHost::new());

    run(captured(&chatty), &host).await.unwrap();

    let expected_out: Vec<String> = (1..=200).map(|i| format!("out{i}")).collect();
    let expected_err: Vec<String> = (1..=200).map(|i| format!("err{i}")).collect();
    assert_eq!(host.texts_on(StreamKind::Output), expected_out);
    assert_eq!(host.texts_on(StreamKind::Error), expected_err);
}

#[tokio::test]
async fn undecodable_line_reports_parse_failure_and_continues() {
    let scripts = Scripts::new();
    let body = format!(
        "printf '%s\\n' '{SENTINEL}' 'not a document' '{}'",
        tagged("output", "after"),
    );
    let tool = scripts.script("tool", &body);
    let host = Arc::new(RecordingHost::new());

    run(captured(&tool), &host).await.unwrap();

    let errors = host.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].category, ErrorCategory::ParserError);
    assert!(errors[0].message.contains("tool"), "message: {}", errors[0].message);
    assert_eq!(host.texts_on(StreamKind::Output), vec!["after"]);
}

#[tokio::test]
async fn sentinel_later_in_stream_is_plain_text() {
    let scripts = Scripts::new();
    let tool = scripts.script("tool", &format!("echo first; echo '{SENTINEL}'"));
    let host = Arc::new(RecordingHost::new());

    run(captured(&tool), &host).await.unwrap();

    assert_eq!(host.texts_on(StreamKind::Output), vec!["first", SENTINEL]);
}

#[tokio::test]
async fn process_runs_in_invocation_location() {
    let scripts = Scripts::new();
    let here = scripts.script("here", "pwd -P");
    let host = Arc::new(RecordingHost::new());
    let location = std::fs::canonicalize(scripts.path()).unwrap();

    let inv = captured(&here).location(location.to_string_lossy());
    run(inv, &host).await.unwrap();

    assert_eq!(host.texts_on(StreamKind::Output), vec![location.to_string_lossy().into_owned()]);
}
