// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host-side collaborator interface.
//!
//! The engine never formats or displays anything itself. Every record, the
//! exit code and transcript text are handed to a [`Host`], and failures coming
//! back from the host are tagged with [`HostError`] so the engine can decide
//! which ones propagate untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::ProcessOutputRecord;

/// Tagged failure returned by host callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The pipeline is stopping; unwind without reporting.
    #[error("the pipeline has been stopped")]
    Stopped,

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Failed(String),
}

/// A character-cell position in the host console buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Coordinates {
    pub row: u16,
    pub column: u16,
}

impl Coordinates {
    pub fn new(row: u16, column: u16) -> Self {
        Self { row, column }
    }
}

/// Read access to the host console's screen buffer.
///
/// Used only to capture the output of a standalone process into the
/// transcript after it exits.
pub trait ConsoleBuffer: Send + Sync {
    fn cursor_position(&self) -> Coordinates;

    /// Width of the buffer in cells.
    fn width(&self) -> u16;

    /// Cells of `row` in `[from, to)`; out-of-range cells read as spaces.
    fn read_cells(&self, row: u16, from: u16, to: u16) -> Vec<char>;
}

/// Text encoding used for data written to a child's stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    /// 7-bit ASCII; other characters become `?`.
    Ascii,
}

impl TextEncoding {
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            TextEncoding::Ascii => {
                text.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }).collect()
            }
        }
    }
}

/// Callbacks into the hosting shell.
pub trait Host: Send + Sync {
    /// Deliver one record to the host stream named by `record.stream`.
    fn emit(&self, record: ProcessOutputRecord) -> Result<(), HostError>;

    /// Publish the exit code of the last native command.
    fn set_last_exit_code(&self, code: i32);

    /// Mark the current pipeline as failed without terminating it.
    fn set_execution_failed(&self) {}

    /// A process is about to share the host's console.
    fn notify_begin_application(&self) {}

    /// The process that shared the console has finished.
    fn notify_end_application(&self) {}

    fn is_transcribing(&self) -> bool {
        false
    }

    fn append_transcript(&self, _text: &str) {}

    fn console(&self) -> Option<&dyn ConsoleBuffer> {
        None
    }

    /// Encoding configured for output sent to native programs.
    fn output_encoding(&self) -> Option<TextEncoding> {
        None
    }
}
