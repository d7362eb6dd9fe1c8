// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Cursor;

use nx_core::record::{NATIVE_ERROR_CONTINUATION_ID, NATIVE_ERROR_ID, PARSE_FAILED_ID};
use nx_core::{Payload, Value};
use nx_wire::{encode_document, CLIXML_SENTINEL};
use proptest::prelude::*;

use super::*;

fn texts(records: &[ProcessOutputRecord]) -> Vec<String> {
    records.iter().filter_map(|r| r.payload.as_text().map(str::to_string)).collect()
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[test]
fn plain_output_lines_become_text_records() {
    let mut classifier = LineClassifier::new(StreamKind::Output, "tool");
    let records: Vec<_> = ["hello", "", "world"].iter().flat_map(|l| classifier.classify(l)).collect();
    assert_eq!(texts(&records), vec!["hello", "", "world"]);
    assert!(records.iter().all(|r| r.stream == StreamKind::Output));
    assert_eq!(classifier.state(), LineState::PlainText);
}

#[test]
fn plain_error_lines_are_primary_then_continuations() {
    let mut classifier = LineClassifier::new(StreamKind::Error, "tool");
    let ids: Vec<String> = ["first", "second", "third"]
        .iter()
        .flat_map(|l| classifier.classify(l))
        .map(|r| r.payload.as_error().unwrap().error_id.clone())
        .collect();
    assert_eq!(ids, vec![NATIVE_ERROR_ID, NATIVE_ERROR_CONTINUATION_ID, NATIVE_ERROR_CONTINUATION_ID]);
}

#[test]
fn sentinel_first_line_is_swallowed() {
    let mut classifier = LineClassifier::new(StreamKind::Output, "tool");
    assert!(classifier.classify(CLIXML_SENTINEL).is_empty());
    assert_eq!(classifier.state(), LineState::Protocol);

    let line = encode_document(Some(StreamKind::Warning), &Value::from("careful"));
    let records = classifier.classify(&line);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stream, StreamKind::Warning);
    assert_eq!(records[0].payload.as_text(), Some("careful"));
}

#[yare::parameterized(
    trailing_spaces = { "#< CLIXML   " },
    leading_space   = { " #< CLIXML" },
    lowercase       = { "#< clixml" },
)]
fn near_sentinel_first_line_stays_plain_text(line: &str) {
    let mut classifier = LineClassifier::new(StreamKind::Output, "tool");
    let records = classifier.classify(line);
    assert_eq!(texts(&records), vec![line]);
    assert_eq!(classifier.state(), LineState::PlainText);
}

#[test]
fn sentinel_after_first_line_is_plain_text() {
    let mut classifier = LineClassifier::new(StreamKind::Output, "tool");
    classifier.classify("banner");
    let records = classifier.classify(CLIXML_SENTINEL);
    assert_eq!(texts(&records), vec![CLIXML_SENTINEL]);
}

#[test]
fn untagged_protocol_objects_use_parent_stream() {
    let mut classifier = LineClassifier::new(StreamKind::Error, "tool");
    classifier.classify(CLIXML_SENTINEL);
    let records = classifier.classify(&encode_document(None, &Value::from("oops")));
    assert_eq!(records[0].stream, StreamKind::Error);
    assert_eq!(records[0].payload.as_error().unwrap().message, "oops");
}

#[test]
fn decode_failure_yields_one_record_and_continues() {
    let mut classifier = LineClassifier::new(StreamKind::Output, "tool.exe");
    classifier.classify(CLIXML_SENTINEL);

    let failed = classifier.classify("<Objs><S>unterminated");
    assert_eq!(failed.len(), 1);
    let error = failed[0].payload.as_error().unwrap();
    assert_eq!(error.error_id, PARSE_FAILED_ID);
    assert!(error.message.contains("tool.exe"), "message: {}", error.message);

    let later = classifier.classify(&encode_document(None, &Value::from(5)));
    assert_eq!(later[0].payload, Payload::Value(Value::Int(5)));
    assert_eq!(classifier.state(), LineState::Protocol);
}

#[test]
fn closed_classifier_ignores_lines() {
    let mut classifier = LineClassifier::new(StreamKind::Output, "tool");
    classifier.close();
    assert!(classifier.classify("late").is_empty());
}

// ---------------------------------------------------------------------------
// Line splitting
// ---------------------------------------------------------------------------

#[yare::parameterized(
    single       = { &["a\n"], &["a"], None },
    crlf         = { &["a\r\nb\r\n"], &["a", "b"], None },
    split_chunk  = { &["he", "llo\nwo", "rld"], &["hello"], Some("world") },
    split_crlf   = { &["a\r", "\nb"], &["a"], Some("b") },
    empty_lines  = { &["\n\n"], &["", ""], None },
    lone_cr      = { &["a\rb\n"], &["a\rb"], None },
)]
fn splits_lines(chunks: &[&str], expected: &[&str], tail: Option<&str>) {
    let mut splitter = LineSplitter::default();
    let lines: Vec<String> = chunks.iter().flat_map(|c| splitter.push(c.as_bytes())).collect();
    assert_eq!(lines, expected);
    assert_eq!(splitter.finish().as_deref(), tail);
}

#[test]
fn invalid_utf8_is_replaced() {
    let mut splitter = LineSplitter::default();
    assert_eq!(splitter.push(b"a\xffb\n"), vec!["a\u{FFFD}b"]);
}

// ---------------------------------------------------------------------------
// Multiplexer
// ---------------------------------------------------------------------------

async fn drain(mux: &ProcessOutputMultiplexer) -> Vec<ProcessOutputRecord> {
    let mut records = Vec::new();
    while let Some(record) = mux.queue().take().await {
        records.push(record);
    }
    records
}

#[tokio::test]
async fn multiplexes_both_streams_in_per_stream_order() {
    let stdout = Cursor::new(b"one\ntwo\nthree".to_vec());
    let stderr = Cursor::new(b"bad\nworse\n".to_vec());
    let mux = ProcessOutputMultiplexer::start(Some(stdout), Some(stderr), "tool", CancellationToken::new());

    let records = drain(&mux).await;
    mux.finished().await;

    let out: Vec<_> = records.iter().filter(|r| r.stream == StreamKind::Output).cloned().collect();
    let err: Vec<_> = records.iter().filter(|r| r.stream == StreamKind::Error).cloned().collect();
    assert_eq!(texts(&out), vec!["one", "two", "three"]);
    let messages: Vec<_> = err.iter().map(|r| r.payload.as_error().unwrap().message.clone()).collect();
    assert_eq!(messages, vec!["bad", "worse"]);
}

#[tokio::test]
async fn no_streams_completes_immediately() {
    let mux = ProcessOutputMultiplexer::start(
        None::<Cursor<Vec<u8>>>,
        None::<Cursor<Vec<u8>>>,
        "tool",
        CancellationToken::new(),
    );
    assert!(mux.queue().is_completed());
    assert!(drain(&mux).await.is_empty());
}

#[tokio::test]
async fn stop_completes_queue_with_open_streams() {
    let (_out_writer, out_reader) = tokio::io::duplex(64);
    let mux = ProcessOutputMultiplexer::start(
        Some(out_reader),
        None::<Cursor<Vec<u8>>>,
        "tool",
        CancellationToken::new(),
    );
    mux.stop();
    let records = tokio::time::timeout(std::time::Duration::from_secs(5), drain(&mux)).await.unwrap();
    assert!(records.is_empty());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn plain_lines_keep_their_order(lines in prop::collection::vec("[^\r\n]{0,20}", 0..30)) {
        prop_assume!(!lines.first().is_some_and(|l| nx_wire::is_sentinel(l)));
        let mut classifier = LineClassifier::new(StreamKind::Output, "tool");
        let records: Vec<_> = lines.iter().flat_map(|l| classifier.classify(l)).collect();
        prop_assert_eq!(texts(&records), lines);
    }

    #[test]
    fn protocol_values_keep_their_order(values in prop::collection::vec(any::<i64>(), 0..20)) {
        let mut classifier = LineClassifier::new(StreamKind::Output, "tool");
        prop_assert!(classifier.classify(CLIXML_SENTINEL).is_empty());
        let decoded: Vec<Payload> = values
            .iter()
            .flat_map(|v| classifier.classify(&encode_document(None, &Value::Int(*v))))
            .map(|r| r.payload)
            .collect();
        let expected: Vec<Payload> = values.iter().map(|v| Payload::Value(Value::Int(*v))).collect();
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn chunk_boundaries_do_not_change_lines(
        lines in prop::collection::vec("[a-z ]{0,10}", 1..10),
        cut in 1usize..7,
    ) {
        let joined = lines.join("\n");
        let mut splitter = LineSplitter::default();
        let mut out: Vec<String> = joined.as_bytes().chunks(cut).flat_map(|c| splitter.push(c)).collect();
        out.extend(splitter.finish());
        // A trailing empty line is just the final terminator.
        let mut expected = lines.clone();
        if expected.last().is_some_and(String::is_empty) {
            expected.pop();
        }
        prop_assert_eq!(out, expected);
    }
}
