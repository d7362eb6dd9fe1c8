// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use nx_core::PsObject;
use nx_wire::{decode_line, CLIXML_SENTINEL};
use similar_asserts::assert_eq;
use tokio::io::{AsyncReadExt, DuplexStream};

use super::*;

async fn read_all(mut reader: DuplexStream) -> Vec<u8> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn text_mode_writes_lines_and_flushes_tail_on_done() {
    let (child_side, host_side) = tokio::io::duplex(4096);
    let mut writer = ProcessInputWriter::new();
    writer.start(host_side, StreamFormat::Text, TextEncoding::Utf8).await;

    writer.add(&Value::from("first")).await;
    writer.add(&PsObject::new().with_property("Name", "a").into()).await;
    writer.done().await;

    let text = String::from_utf8(read_all(child_side).await).unwrap();
    assert_eq!(text, "first\nName\n----\na\n");
    assert!(!writer.is_active());
}

#[tokio::test]
async fn xml_mode_writes_sentinel_then_documents() {
    let (child_side, host_side) = tokio::io::duplex(4096);
    let mut writer = ProcessInputWriter::new();
    writer.start(host_side, StreamFormat::Xml, TextEncoding::Utf8).await;
    writer.add(&Value::from("one")).await;
    writer.add(&Value::from(2)).await;
    writer.done().await;

    let text = String::from_utf8(read_all(child_side).await).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], CLIXML_SENTINEL);
    for line in &lines[1..] {
        assert!(line.starts_with(nx_wire::OBJS_OPEN) && line.ends_with(nx_wire::OBJS_CLOSE), "line: {line}");
    }
    assert!(!writer.is_active());
    assert_eq!(decode_line(lines[1]).unwrap()[0].value, Value::from("one"));
    assert_eq!(decode_line(lines[2]).unwrap()[0].value, Value::Int(2));
}

#[tokio::test]
async fn utf16_encoding_is_applied() {
    let (child_side, host_side) = tokio::io::duplex(4096);
    let mut writer = ProcessInputWriter::new();
    writer.start(host_side, StreamFormat::Text, TextEncoding::Utf16Le).await;
    writer.add(&Value::from("hi")).await;
    writer.done().await;

    assert_eq!(read_all(child_side).await, vec![b'h', 0, b'i', 0, b'\n', 0]);
}

#[tokio::test]
async fn stopped_writer_drops_input() {
    let (child_side, host_side) = tokio::io::duplex(4096);
    let mut writer = ProcessInputWriter::new();
    writer.start(host_side, StreamFormat::Text, TextEncoding::Utf8).await;
    let flag = writer.stop_flag();
    writer.add(&Value::from("kept")).await;
    flag.stop();
    writer.add(&Value::from("dropped")).await;
    writer.done().await;

    assert_eq!(String::from_utf8(read_all(child_side).await).unwrap(), "kept\n");
}

#[tokio::test]
async fn closed_child_disposes_writer() {
    let (child_side, host_side) = tokio::io::duplex(16);
    drop(child_side);
    let mut writer = ProcessInputWriter::new();
    writer.start(host_side, StreamFormat::Text, TextEncoding::Utf8).await;

    writer.add(&Value::from("nobody is listening")).await;
    assert!(!writer.is_active());
    writer.add(&Value::from("ignored")).await;
    writer.done().await;
    writer.dispose();
}

#[tokio::test]
async fn unstarted_writer_ignores_everything() {
    let mut writer = ProcessInputWriter::new();
    writer.add(&Value::from("x")).await;
    writer.done().await;
    assert!(!writer.is_active());
}
