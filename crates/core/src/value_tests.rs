// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_scalars() {
    assert_eq!(Value::Null.to_string(), "");
    assert_eq!(Value::Bool(true).to_string(), "True");
    assert_eq!(Value::Int(-3).to_string(), "-3");
    assert_eq!(Value::from("plain").to_string(), "plain");
    assert_eq!(Value::from(vec![1, 2, 3]).to_string(), "1 2 3");
}

#[test]
fn display_object_prefers_to_string() {
    let obj = PsObject::new().with_property("Name", "a").with_to_string("custom");
    assert_eq!(Value::from(obj).to_string(), "custom");
}

#[test]
fn display_object_renders_properties() {
    let obj = PsObject::new().with_property("Name", "a").with_property("Size", 4);
    assert_eq!(Value::from(obj).to_string(), "@{Name=a; Size=4}");
}

#[test]
fn display_object_falls_back_to_type_name() {
    let obj = PsObject::new().with_type("System.Object");
    assert_eq!(Value::from(obj).to_string(), "System.Object");
}

#[test]
fn property_lookup_ignores_case() {
    let obj = PsObject::new().with_property("Activity", "copy");
    assert_eq!(obj.get("activity"), Some(&Value::from("copy")));
    assert_eq!(obj.get("missing"), None);
}

#[test]
fn is_type_matches_short_name() {
    let obj = PsObject::new().with_type("System.Management.Automation.ErrorRecord");
    assert!(obj.is_type("ErrorRecord"));
    assert!(obj.is_type("system.management.automation.errorrecord"));
    assert!(!obj.is_type("ProgressRecord"));
}

#[test]
fn from_json_converts_nested_values() {
    let json = serde_json::json!({ "zeta": 1, "alpha": [true, null], "mid": 1.5 });
    let value = Value::from(json);
    let props = value.properties().unwrap();
    let keys: Vec<&str> = props.keys().map(String::as_str).collect();
    // serde_json without preserve_order sorts keys
    assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    assert_eq!(props["alpha"], Value::List(vec![Value::Bool(true), Value::Null]));
    assert_eq!(props["mid"], Value::Float(1.5));
}

#[test]
fn as_i64_accepts_numeric_strings() {
    assert_eq!(Value::from(" 42 ").as_i64(), Some(42));
    assert_eq!(Value::Float(3.0).as_i64(), Some(3));
    assert_eq!(Value::Float(3.5).as_i64(), None);
    assert_eq!(Value::Null.as_i64(), None);
}
