// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encoding of values into single-line `<Objs>` documents.

use std::fmt::Write as _;

use nx_core::{PsObject, StreamKind, Value};
use quick_xml::escape::escape;

use crate::escape::encode_text;
use crate::{OBJS_CLOSE, OBJS_OPEN};

/// Encode one value as a complete single-line document.
///
/// `stream` adds an `S` attribute naming the sub-stream. Every document
/// numbers its `RefId`s from zero, so documents decode independently.
pub fn encode_document(stream: Option<StreamKind>, value: &Value) -> String {
    let mut writer = ObjWriter::default();
    writer.out.push_str(OBJS_OPEN);
    writer.value(value, None, stream);
    writer.out.push_str(OBJS_CLOSE);
    writer.out
}

/// Encode one value as a bare element (no `<Objs>` wrapper).
pub fn encode_value(value: &Value) -> String {
    let mut writer = ObjWriter::default();
    writer.value(value, None, None);
    writer.out
}

#[derive(Default)]
struct ObjWriter {
    out: String,
    next_ref: usize,
    type_refs: Vec<(Vec<String>, usize)>,
}

impl ObjWriter {
    fn value(&mut self, value: &Value, name: Option<&str>, stream: Option<StreamKind>) {
        let attrs = Attrs { name, stream };
        match value {
            Value::Null => self.out.push_str(&format!("<Nil{attrs} />")),
            Value::Bool(b) => self.leaf("B", attrs, if *b { "true" } else { "false" }),
            Value::Int(n) => {
                let tag = if i32::try_from(*n).is_ok() { "I32" } else { "I64" };
                self.leaf(tag, attrs, &n.to_string());
            }
            Value::Float(f) => self.leaf("Db", attrs, &format_float(*f)),
            Value::String(s) => self.leaf("S", attrs, &text(s)),
            Value::List(items) => {
                let id = self.take_ref();
                let _ = write!(self.out, "<Obj{attrs} RefId=\"{id}\">");
                self.type_names(&["System.Object[]".to_string(), "System.Array".to_string()]);
                self.out.push_str("<LST>");
                for item in items {
                    self.value(item, None, None);
                }
                self.out.push_str("</LST></Obj>");
            }
            Value::Object(obj) => self.object(obj, attrs),
        }
    }

    fn object(&mut self, obj: &PsObject, attrs: Attrs<'_>) {
        let id = self.take_ref();
        let _ = write!(self.out, "<Obj{attrs} RefId=\"{id}\">");
        if !obj.type_names.is_empty() {
            self.type_names(&obj.type_names);
        }
        if let Some(to_string) = &obj.to_string {
            let _ = write!(self.out, "<ToString>{}</ToString>", text(to_string));
        }
        if !obj.properties.is_empty() {
            self.out.push_str("<MS>");
            for (key, value) in &obj.properties {
                self.value(value, Some(key), None);
            }
            self.out.push_str("</MS>");
        }
        self.out.push_str("</Obj>");
    }

    fn type_names(&mut self, names: &[String]) {
        if let Some((_, id)) = self.type_refs.iter().find(|(known, _)| known == names) {
            let _ = write!(self.out, "<TNRef RefId=\"{id}\" />");
            return;
        }
        let id = self.type_refs.len();
        self.type_refs.push((names.to_vec(), id));
        let _ = write!(self.out, "<TN RefId=\"{id}\">");
        for name in names {
            let _ = write!(self.out, "<T>{}</T>", text(name));
        }
        self.out.push_str("</TN>");
    }

    fn leaf(&mut self, tag: &str, attrs: Attrs<'_>, body: &str) {
        let _ = write!(self.out, "<{tag}{attrs}>{body}</{tag}>");
    }

    fn take_ref(&mut self) -> usize {
        let id = self.next_ref;
        self.next_ref += 1;
        id
    }
}

#[derive(Clone, Copy)]
struct Attrs<'a> {
    name: Option<&'a str>,
    stream: Option<StreamKind>,
}

impl std::fmt::Display for Attrs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = self.name {
            write!(f, " N=\"{}\"", text(name))?;
        }
        if let Some(stream) = self.stream {
            write!(f, " S=\"{}\"", stream.wire_tag())?;
        }
        Ok(())
    }
}

fn text(s: &str) -> String {
    escape(encode_text(s).as_str()).into_owned()
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "INF".to_string()
    } else if f == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        f.to_string()
    }
}

#[cfg(test)]
#[path = "encode_tests.rs"]
mod tests;
