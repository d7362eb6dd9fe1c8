// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source position of the invocation that launched a native command.
//!
//! Launch failures carry a rendered position so the user can see which line
//! of their script tried to start the program.

use serde::{Deserialize, Serialize};

/// A byte-offset range in the invoking source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Where in the host's source an invocation came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Script path, or `None` for interactive input.
    pub script: Option<String>,
    /// Full text of the invoking script or command line.
    pub source: String,
    pub span: Span,
}

impl SourcePosition {
    /// Position covering an entire one-line command.
    pub fn command_line(text: impl Into<String>) -> Self {
        let source = text.into();
        let span = Span::new(0, source.len());
        Self { script: None, source, span }
    }

    pub fn in_script(script: impl Into<String>, source: impl Into<String>, span: Span) -> Self {
        Self { script: Some(script.into()), source: source.into(), span }
    }

    /// Render the position for an error message.
    ///
    /// ```text
    /// At build.ps1:3 char:5
    /// + run ./tool --flag
    /// +     ~~~~~~
    /// ```
    ///
    /// Returns an empty string when no source text is known.
    pub fn describe(&self) -> String {
        if self.source.is_empty() {
            return String::new();
        }
        let (line_num, col, line_content) = locate_span(&self.source, self.span);
        let remaining = line_content.chars().count().saturating_sub(col).max(1);
        let underline = self.span.len().clamp(1, remaining);
        let location = match &self.script {
            Some(script) => format!("At {script}:{line_num} char:{}", col + 1),
            None => format!("At line:{line_num} char:{}", col + 1),
        };
        format!("{location}\n+ {line_content}\n+ {}{}", " ".repeat(col), "~".repeat(underline))
    }
}

/// Locate a span in source, returning (line_number, column, line_content).
///
/// Line numbers are 1-indexed; column is 0-indexed from line start.
pub fn locate_span(source: &str, span: Span) -> (usize, usize, &str) {
    let mut line_num = 1;
    let mut line_start = 0;

    for (i, ch) in source.char_indices() {
        if i >= span.start {
            break;
        }
        if ch == '\n' {
            line_num += 1;
            line_start = i + 1;
        }
    }

    let line_end = source[line_start..].find('\n').map(|i| line_start + i).unwrap_or(source.len());

    // Handle case where span.start might be beyond source length
    let effective_start = span.start.min(source.len());
    let col = if effective_start >= line_start {
        source[line_start..effective_start].chars().count()
    } else {
        0
    };

    (line_num, col, &source[line_start..line_end])
}

#[cfg(test)]
#[path = "position_tests.rs"]
mod tests;
