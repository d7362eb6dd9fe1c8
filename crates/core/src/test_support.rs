// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use parking_lot::Mutex;

use crate::host::{ConsoleBuffer, Coordinates, Host, HostError};
use crate::record::{ErrorRecord, Payload, ProcessOutputRecord};
use crate::stream::StreamKind;

/// Calls a [`RecordingHost`] received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Emit(ProcessOutputRecord),
    ExitCode(i32),
    ExecutionFailed,
    BeginApplication,
    EndApplication,
    Transcript(String),
}

/// A [`Host`] that records everything it is told.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    transcribing: bool,
    console: Option<FakeConsole>,
    /// Fail `emit` with this error after this many records.
    fail_emit_after: Option<(usize, HostError)>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcribing(mut self, console: Option<FakeConsole>) -> Self {
        self.transcribing = true;
        self.console = console;
        self
    }

    pub fn failing_after(mut self, records: usize, error: HostError) -> Self {
        self.fail_emit_after = Some((records, error));
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn records(&self) -> Vec<ProcessOutputRecord> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                HostCall::Emit(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn records_on(&self, stream: StreamKind) -> Vec<ProcessOutputRecord> {
        self.records().into_iter().filter(|r| r.stream == stream).collect()
    }

    /// Text of every record on `stream` that has text.
    pub fn texts_on(&self, stream: StreamKind) -> Vec<String> {
        self.records_on(stream)
            .iter()
            .filter_map(|r| match &r.payload {
                Payload::Error(e) => Some(e.message.clone()),
                other => other.as_text().map(str::to_string),
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.records_on(StreamKind::Error)
            .into_iter()
            .filter_map(|r| match r.payload {
                Payload::Error(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn last_exit_code(&self) -> Option<i32> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            HostCall::ExitCode(code) => Some(*code),
            _ => None,
        })
    }

    pub fn count(&self, call: &HostCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn transcript(&self) -> String {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                HostCall::Transcript(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn fake_console(&self) -> Option<&FakeConsole> {
        self.console.as_ref()
    }
}

impl Host for RecordingHost {
    fn emit(&self, record: ProcessOutputRecord) -> Result<(), HostError> {
        let mut calls = self.calls.lock();
        if let Some((limit, error)) = &self.fail_emit_after {
            let emitted = calls.iter().filter(|c| matches!(c, HostCall::Emit(_))).count();
            if emitted >= *limit {
                return Err(error.clone());
            }
        }
        calls.push(HostCall::Emit(record));
        Ok(())
    }

    fn set_last_exit_code(&self, code: i32) {
        self.calls.lock().push(HostCall::ExitCode(code));
    }

    fn set_execution_failed(&self) {
        self.calls.lock().push(HostCall::ExecutionFailed);
    }

    fn notify_begin_application(&self) {
        self.calls.lock().push(HostCall::BeginApplication);
    }

    fn notify_end_application(&self) {
        self.calls.lock().push(HostCall::EndApplication);
    }

    fn is_transcribing(&self) -> bool {
        self.transcribing
    }

    fn append_transcript(&self, text: &str) {
        self.calls.lock().push(HostCall::Transcript(text.to_string()));
    }

    fn console(&self) -> Option<&dyn ConsoleBuffer> {
        self.console.as_ref().map(|c| c as &dyn ConsoleBuffer)
    }
}

/// An in-memory console screen buffer.
pub struct FakeConsole {
    width: u16,
    rows: Mutex<Vec<Vec<char>>>,
    cursor: Mutex<Coordinates>,
}

impl FakeConsole {
    pub fn new(width: u16) -> Self {
        Self { width, rows: Mutex::new(Vec::new()), cursor: Mutex::new(Coordinates::default()) }
    }

    /// Write `text` at the cursor, wrapping at the buffer width.
    pub fn write(&self, text: &str) {
        let mut rows = self.rows.lock();
        let mut cursor = self.cursor.lock();
        for ch in text.chars() {
            if ch == '\n' {
                cursor.row += 1;
                cursor.column = 0;
                continue;
            }
            while rows.len() <= cursor.row as usize {
                rows.push(vec![' '; self.width as usize]);
            }
            rows[cursor.row as usize][cursor.column as usize] = ch;
            cursor.column += 1;
            if cursor.column >= self.width {
                cursor.row += 1;
                cursor.column = 0;
            }
        }
    }
}

impl ConsoleBuffer for FakeConsole {
    fn cursor_position(&self) -> Coordinates {
        *self.cursor.lock()
    }

    fn width(&self) -> u16 {
        self.width
    }

    fn read_cells(&self, row: u16, from: u16, to: u16) -> Vec<char> {
        let rows = self.rows.lock();
        (from..to)
            .map(|col| {
                rows.get(row as usize).and_then(|r| r.get(col as usize)).copied().unwrap_or(' ')
            })
            .collect()
    }
}
