// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering of host objects as text lines for a child's stdin.

use nx_core::{PsObject, Value};

/// Turns values into text lines, possibly holding some back until
/// [`finish`](Formatter::finish).
pub trait Formatter: Send {
    fn format(&mut self, value: &Value) -> Vec<String>;

    /// Lines still held back; called once when input ends.
    fn finish(&mut self) -> Vec<String>;
}

/// Default text rendering.
///
/// Scalars are written at once, one line per text line. Consecutive objects
/// with the same property names are collected into a table that is rendered
/// when a differently shaped value arrives or input ends.
#[derive(Debug, Default)]
pub struct StringifyFormatter {
    table: Option<Table>,
}

impl StringifyFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush(&mut self) -> Vec<String> {
        self.table.take().map(Table::render).unwrap_or_default()
    }
}

impl Formatter for StringifyFormatter {
    fn format(&mut self, value: &Value) -> Vec<String> {
        match value {
            Value::Null => Vec::new(),
            Value::List(items) => items.iter().flat_map(|item| self.format(item)).collect(),
            Value::Object(obj) if obj.to_string.is_none() && !obj.properties.is_empty() => {
                let columns: Vec<&String> = obj.properties.keys().collect();
                if let Some(table) = &mut self.table {
                    if table.columns.iter().eq(columns.iter().copied()) {
                        table.push(obj);
                        return Vec::new();
                    }
                }
                let lines = self.flush();
                self.table = Some(Table::new(obj));
                lines
            }
            scalar => {
                let mut lines = self.flush();
                let text = scalar.to_string();
                if text.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.extend(text.lines().map(str::to_string));
                }
                lines
            }
        }
    }

    fn finish(&mut self) -> Vec<String> {
        self.flush()
    }
}

#[derive(Debug)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(first: &PsObject) -> Self {
        let mut table = Self { columns: first.properties.keys().cloned().collect(), rows: Vec::new() };
        table.push(first);
        table
    }

    fn push(&mut self, obj: &PsObject) {
        self.rows.push(obj.properties.values().map(cell).collect());
    }

    fn render(self) -> Vec<String> {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                self.rows
                    .iter()
                    .map(|row| row.get(i).map_or(0, |c| c.chars().count()))
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let line = |cells: Vec<String>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, &w)| format!("{c:<w$}"))
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(line(self.columns.clone()));
        lines.push(line(self.columns.iter().map(|c| "-".repeat(c.chars().count())).collect()));
        for row in self.rows {
            lines.push(line(row));
        }
        lines
    }
}

fn cell(value: &Value) -> String {
    value.to_string().replace(['\r', '\n'], " ")
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
