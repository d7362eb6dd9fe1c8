// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured values exchanged with a native process.
//!
//! A [`Value`] is what the structured wire protocol decodes into and what the
//! input writer serializes. Objects keep their properties in declaration
//! order so that formatting and re-serialization are stable.

use std::fmt;

use indexmap::IndexMap;

/// A decoded structured value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Object(PsObject),
}

/// A property bag with optional type names and a preformatted string form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PsObject {
    /// Most-derived type first.
    pub type_names: Vec<String>,
    /// Text the producer rendered for this object, if any.
    pub to_string: Option<String>,
    pub properties: IndexMap<String, Value>,
}

impl PsObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: impl Into<String>) -> Self {
        self.type_names.push(name.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_to_string(mut self, text: impl Into<String>) -> Self {
        self.to_string = Some(text.into());
        self
    }

    /// Case-insensitive property lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties
            .get(name)
            .or_else(|| {
                self.properties.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v)
            })
    }

    /// Returns true if any type name ends with `suffix` (ignoring namespace).
    pub fn is_type(&self, suffix: &str) -> bool {
        self.type_names.iter().any(|t| {
            t.eq_ignore_ascii_case(suffix)
                || t.rsplit('.').next().is_some_and(|last| last.eq_ignore_ascii_case(suffix))
        })
    }
}

impl Value {
    /// Borrow the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PsObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Properties of an object value that has any; `None` for everything else.
    pub fn properties(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(obj) if !obj.properties.is_empty() => Some(&obj.properties),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(obj) => match (&obj.to_string, obj.type_names.first()) {
                (Some(text), _) => f.write_str(text),
                (None, _) if !obj.properties.is_empty() => {
                    f.write_str("@{")?;
                    for (i, (k, v)) in obj.properties.iter().enumerate() {
                        if i > 0 {
                            f.write_str("; ")?;
                        }
                        write!(f, "{k}={v}")?;
                    }
                    f.write_str("}")
                }
                (None, Some(type_name)) => f.write_str(type_name),
                (None, None) => Ok(()),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<PsObject> for Value {
    fn from(obj: PsObject) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(PsObject {
                type_names: Vec::new(),
                to_string: None,
                properties: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
