// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoding of structured-protocol lines into values and records.

use std::collections::HashMap;

use nx_core::{
    ErrorRecord, Payload, ProcessOutputRecord, ProgressRecord, PsObject, StreamKind, Value,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::WireError;
use crate::escape::decode_text;

/// One top-level object from a protocol line, with its declared sub-stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Raw value of the `S` attribute, if present.
    pub stream_tag: Option<String>,
    pub value: Value,
}

impl Decoded {
    /// Stream this object is routed to; unknown or missing tags fall back to
    /// `parent`.
    pub fn stream(&self, parent: StreamKind) -> StreamKind {
        self.stream_tag.as_deref().and_then(StreamKind::from_tag).unwrap_or(parent)
    }

    /// Shape the decoded value into a record for its stream.
    pub fn into_record(self, parent: StreamKind) -> ProcessOutputRecord {
        let stream = self.stream(parent);
        let payload = match stream {
            StreamKind::Error => Payload::Error(ErrorRecord::from_value(&self.value)),
            StreamKind::Progress => Payload::Progress(ProgressRecord::from_value(&self.value)),
            StreamKind::Warning | StreamKind::Verbose | StreamKind::Debug => {
                Payload::Value(Value::String(message_text(&self.value)))
            }
            StreamKind::Information => Payload::Value(information_data(self.value)),
            StreamKind::Output | StreamKind::Unknown => Payload::Value(self.value),
        };
        ProcessOutputRecord::new(stream, payload)
    }
}

/// Message of a warning/verbose/debug record: its `Message` property, or its
/// text.
fn message_text(value: &Value) -> String {
    match value {
        Value::Object(obj) => obj
            .get("Message")
            .or_else(|| obj.get("InformationalRecord_Message"))
            .map(Value::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

/// Payload of an information record: its `MessageData`, or the value itself.
fn information_data(value: Value) -> Value {
    match &value {
        Value::Object(obj) => obj.get("MessageData").cloned().unwrap_or(value),
        _ => value,
    }
}

/// Decode one protocol line (a complete `<Objs>` document).
///
/// Blank lines decode to nothing.
pub fn decode_line(line: &str) -> Result<Vec<Decoded>, WireError> {
    if line.trim().is_empty() {
        return Ok(Vec::new());
    }
    let root = parse_tree(line)?;
    if root.name != "Objs" {
        return Err(WireError::UnexpectedRoot(root.name));
    }
    let mut refs = RefTable::default();
    root.children
        .iter()
        .map(|child| {
            Ok(Decoded { stream_tag: child.attr("S").map(str::to_string), value: refs.value(child)? })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, WireError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(WireError::xml)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(WireError::xml)?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self { name, attrs, ..Self::default() })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn parse_tree(line: &str) -> Result<Element, WireError> {
    let mut reader = Reader::from_str(line);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(WireError::xml)? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => attach(&mut stack, &mut root, Element::open(&start)?)?,
            Event::End(_) => {
                let element = stack.pop().ok_or(WireError::Truncated)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(WireError::xml)?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(WireError::Truncated);
    }
    root.ok_or(WireError::Empty)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), WireError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(WireError::UnexpectedElement(element.name)),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Element → Value
// ---------------------------------------------------------------------------

/// Objects and type-name lists seen so far in one document, by `RefId`.
#[derive(Default)]
struct RefTable {
    objects: HashMap<String, Value>,
    type_names: HashMap<String, Vec<String>>,
}

impl RefTable {
    fn value(&mut self, el: &Element) -> Result<Value, WireError> {
        let text = || decode_text(&el.text);
        match el.name.as_str() {
            "S" | "URI" | "Version" | "G" | "DT" | "TS" | "XD" | "SBK" | "BA" => {
                Ok(Value::String(text()))
            }
            "C" => {
                let code: u32 = parse(el)?;
                Ok(Value::String(char::from_u32(code).map(String::from).unwrap_or_default()))
            }
            "I16" | "I32" | "I64" | "SB" | "By" | "U16" | "U32" => Ok(Value::Int(parse(el)?)),
            "U64" => match el.text.trim().parse::<i64>() {
                Ok(n) => Ok(Value::Int(n)),
                Err(_) => Ok(Value::Float(parse::<u64>(el)? as f64)),
            },
            "Db" | "Sg" | "D" => Ok(Value::Float(parse_float(el)?)),
            "B" => match el.text.trim() {
                t if t.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                t if t.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(invalid(el)),
            },
            "Nil" => Ok(Value::Null),
            "Ref" => {
                let id = el.attr("RefId").unwrap_or_default();
                self.objects.get(id).cloned().ok_or_else(|| WireError::UnknownRef(id.to_string()))
            }
            "Obj" => {
                let value = self.object(el)?;
                if let Some(id) = el.attr("RefId") {
                    self.objects.insert(id.to_string(), value.clone());
                }
                Ok(value)
            }
            other => Err(WireError::UnexpectedElement(other.to_string())),
        }
    }

    fn object(&mut self, el: &Element) -> Result<Value, WireError> {
        let mut obj = PsObject::new();
        let mut items: Option<Vec<Value>> = None;
        let mut base: Option<Value> = None;

        for child in &el.children {
            match child.name.as_str() {
                "TN" => {
                    let names: Vec<String> = child
                        .children
                        .iter()
                        .filter(|t| t.name == "T")
                        .map(|t| decode_text(&t.text))
                        .collect();
                    if let Some(id) = child.attr("RefId") {
                        self.type_names.insert(id.to_string(), names.clone());
                    }
                    obj.type_names = names;
                }
                "TNRef" => {
                    let id = child.attr("RefId").unwrap_or_default();
                    obj.type_names = self
                        .type_names
                        .get(id)
                        .cloned()
                        .ok_or_else(|| WireError::UnknownRef(id.to_string()))?;
                }
                "ToString" => obj.to_string = Some(decode_text(&child.text)),
                "Props" | "MS" => {
                    for member in &child.children {
                        let name = member.attr("N").map(decode_text).unwrap_or_default();
                        let value = self.value(member)?;
                        obj.properties.insert(name, value);
                    }
                }
                "LST" | "IE" | "STK" | "QUE" => {
                    let list = child.children.iter().map(|c| self.value(c)).collect::<Result<_, _>>()?;
                    items = Some(list);
                }
                "DCT" => {
                    for entry in child.children.iter().filter(|e| e.name == "En") {
                        let key = entry
                            .children
                            .iter()
                            .find(|c| c.attr("N") == Some("Key"))
                            .map(|c| self.value(c))
                            .transpose()?
                            .unwrap_or_default();
                        let value = entry
                            .children
                            .iter()
                            .find(|c| c.attr("N") == Some("Value"))
                            .map(|c| self.value(c))
                            .transpose()?
                            .unwrap_or_default();
                        obj.properties.insert(key.to_string(), value);
                    }
                }
                _ => base = Some(self.value(child)?),
            }
        }

        // Collections and adapted primitives decode to their plain form
        // unless they carry extra members.
        if obj.properties.is_empty() {
            if let Some(items) = items {
                return Ok(Value::List(items));
            }
            if let Some(base) = base {
                return Ok(base);
            }
        }
        Ok(Value::Object(obj))
    }
}

fn parse<T: std::str::FromStr>(el: &Element) -> Result<T, WireError> {
    el.text.trim().parse().map_err(|_| invalid(el))
}

fn parse_float(el: &Element) -> Result<f64, WireError> {
    match el.text.trim() {
        "NaN" => Ok(f64::NAN),
        "INF" | "Infinity" => Ok(f64::INFINITY),
        "-INF" | "-Infinity" => Ok(f64::NEG_INFINITY),
        _ => parse(el),
    }
}

fn invalid(el: &Element) -> WireError {
    WireError::InvalidValue { element: el.name.clone(), text: el.text.clone() }
}

#[cfg(test)]
#[path = "decode_tests.rs"]
mod tests;
