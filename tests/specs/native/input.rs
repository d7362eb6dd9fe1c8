//! Input specs
//!
//! Verify upstream values are written to a child's stdin.

use std::sync::Arc;

use crate::prelude::*;

fn cat() -> Invocation {
    Invocation::new("cat").expects_input(true).position(PipelinePosition::captured())
}

fn widget(name: &str, count: i64) -> Value {
    PsObject::new()
        .with_type("Sample.Widget")
        .with_property("Name", name)
        .with_property("Count", count)
        .into()
}

#[tokio::test]
async fn scalars_are_written_one_per_line() {
    let host = Arc::new(RecordingHost::new());
    let input = vec![Value::from("alpha"), Value::from(7i64), Value::from(true)];

    native(cat(), &host).run(input).await.unwrap();

    assert_eq!(host.texts_on(StreamKind::Output), vec!["alpha", "7", "True"]);
}

#[tokio::test]
async fn property_bags_are_written_as_a_table() {
    let host = Arc::new(RecordingHost::new());
    let input = vec![widget("bolt", 3), widget("nut", 12)];

    native(cat(), &host).run(input).await.unwrap();

    let lines = host.texts_on(StreamKind::Output);
    let header = lines.iter().find(|l| !l.is_empty()).unwrap();
    assert!(header.contains("Name") && header.contains("Count"), "header: {header}");
    assert!(lines.iter().any(|l| l.contains("bolt") && l.contains('3')));
    assert!(lines.iter().any(|l| l.contains("nut") && l.contains("12")));
}

#[tokio::test]
async fn structured_input_round_trips_through_cat() {
    let host = Arc::new(RecordingHost::new());
    let inv = cat().input_format(StreamFormat::Xml);

    native(inv, &host).run(vec![widget("bolt", 3)]).await.unwrap();

    let records = host.records_on(StreamKind::Output);
    assert_eq!(records.len(), 1);
    let Payload::Value(Value::Object(obj)) = &records[0].payload else {
        panic!("expected an object, got {:?}", records[0].payload);
    };
    assert_eq!(obj.get("Name"), Some(&Value::from("bolt")));
    assert_eq!(obj.get("Count"), Some(&Value::from(3i64)));
    assert!(obj.is_type("Widget"));
}

#[tokio::test]
async fn child_that_ignores_stdin_still_completes() {
    let scripts = Scripts::new();
    let quick = scripts.script("quick", "exit 0");
    let host = Arc::new(RecordingHost::new());
    let inv = captured(&quick).expects_input(true);
    let input: Vec<Value> = (0..2000).map(|i| Value::from(format!("line {i} {}", "x".repeat(64)))).collect();

    let outcome = native(inv, &host).run(input).await.unwrap();

    assert_eq!(outcome.code(), Some(0));
    assert!(host.errors().is_empty());
}
