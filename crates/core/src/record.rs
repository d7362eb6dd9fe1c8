// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed records produced while a native process runs.

use serde::{Deserialize, Serialize};

use crate::stream::StreamKind;
use crate::value::{PsObject, Value};

/// Error id of the first plain-text stderr line.
pub const NATIVE_ERROR_ID: &str = "NativeCommandError";
/// Error id of every stderr line after the first.
pub const NATIVE_ERROR_CONTINUATION_ID: &str = "NativeCommandErrorMessage";
/// Error id of a structured payload that could not be decoded.
pub const PARSE_FAILED_ID: &str = "ProcessStreamParseFailed";
/// Error id of the record emitted for a non-zero exit code.
pub const NON_ZERO_EXIT_ID: &str = "ProgramExitedWithNonZeroCode";

/// Coarse classification of an [`ErrorRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorCategory {
    #[default]
    NotSpecified,
    /// Supplementary stderr text following the primary error line.
    NotSpecifiedContinuation,
    ParserError,
    InvalidData,
    InvalidResult,
    ResourceUnavailable,
    OperationStopped,
}

crate::simple_display! {
    ErrorCategory {
        NotSpecified => "NotSpecified",
        NotSpecifiedContinuation => "NotSpecified",
        ParserError => "ParserError",
        InvalidData => "InvalidData",
        InvalidResult => "InvalidResult",
        ResourceUnavailable => "ResourceUnavailable",
        OperationStopped => "OperationStopped",
    }
}

/// A diagnostic routed to the host's error stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorRecord {
    pub error_id: String,
    pub message: String,
    pub category: ErrorCategory,
    /// What the error is about (usually the process file name).
    pub target: Option<String>,
    pub exit_code: Option<i32>,
    pub process_id: Option<u32>,
    pub source_path: Option<String>,
}

impl ErrorRecord {
    pub fn new(error_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error_id: error_id.into(), message: message.into(), ..Self::default() }
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Primary stderr line of a plain-text process.
    pub fn native_error(line: impl Into<String>) -> Self {
        Self::new(NATIVE_ERROR_ID, line)
    }

    /// Stderr line that follows the primary one.
    pub fn native_error_continuation(line: impl Into<String>) -> Self {
        Self::new(NATIVE_ERROR_CONTINUATION_ID, line)
            .with_category(ErrorCategory::NotSpecifiedContinuation)
    }

    /// Synthetic record for a structured payload that failed to decode.
    pub fn parse_failed(stream: StreamKind, file_name: &str, reason: &str) -> Self {
        Self::new(
            PARSE_FAILED_ID,
            format!(
                "Failed to parse structured {stream} data from process '{file_name}': {reason}"
            ),
        )
        .with_category(ErrorCategory::ParserError)
        .with_target(stream.to_string())
    }

    /// Record emitted when a process ends with a non-zero exit code.
    pub fn non_zero_exit(command_path: &str, exit_code: i32, process_id: Option<u32>) -> Self {
        let name = std::path::Path::new(command_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| command_path.to_string());
        Self {
            error_id: NON_ZERO_EXIT_ID.to_string(),
            message: format!("Program \"{name}\" ended with non-zero exit code: {exit_code}."),
            category: ErrorCategory::NotSpecified,
            target: Some(name),
            exit_code: Some(exit_code),
            process_id,
            source_path: Some(command_path.to_string()),
        }
    }

    /// Build an error record from a decoded structured value.
    ///
    /// Objects contribute `FullyQualifiedErrorId`, the exception message
    /// (`Exception.Message`, `Message`, or the object's own text) and
    /// `TargetObject`. Anything else becomes the message text verbatim.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(obj) = value else {
            return Self::new(NATIVE_ERROR_ID, value.to_string());
        };
        let message = error_message(obj);
        let error_id = obj
            .get("FullyQualifiedErrorId")
            .map(Value::to_string)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NATIVE_ERROR_ID.to_string());
        let target =
            obj.get("TargetObject").filter(|v| !v.is_null()).map(Value::to_string);
        Self { error_id, message, target, ..Self::default() }
    }
}

fn error_message(obj: &PsObject) -> String {
    let exception_message = obj
        .get("Exception")
        .and_then(|e| match e {
            Value::Object(ex) => ex.get("Message").map(Value::to_string).or(ex.to_string.clone()),
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty());
    exception_message
        .or_else(|| obj.get("Message").map(Value::to_string))
        .unwrap_or_else(|| Value::Object(obj.clone()).to_string())
}

/// Whether a progress activity is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgressRecordType {
    #[default]
    Processing,
    Completed,
}

/// A progress update for a long-running activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub activity_id: i32,
    pub parent_activity_id: i32,
    pub activity: String,
    pub status_description: String,
    pub current_operation: Option<String>,
    /// -1 when unknown.
    pub percent_complete: i32,
    /// -1 when unknown.
    pub seconds_remaining: i32,
    pub record_type: ProgressRecordType,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            activity_id: 0,
            parent_activity_id: -1,
            activity: String::new(),
            status_description: String::new(),
            current_operation: None,
            percent_complete: -1,
            seconds_remaining: -1,
            record_type: ProgressRecordType::Processing,
        }
    }
}

impl ProgressRecord {
    pub fn new(activity: impl Into<String>, status: impl Into<String>) -> Self {
        Self { activity: activity.into(), status_description: status.into(), ..Self::default() }
    }

    /// Build a progress record from a decoded object; missing fields keep
    /// their defaults, a non-object value becomes the activity text.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(obj) = value else {
            return Self::new(value.to_string(), String::new());
        };
        let text = |name: &str| obj.get(name).map(Value::to_string).unwrap_or_default();
        let int = |name: &str, default: i32| {
            obj.get(name).and_then(Value::as_i64).and_then(|n| i32::try_from(n).ok()).unwrap_or(default)
        };
        let record_type = match obj.get("Type").or_else(|| obj.get("RecordType")) {
            Some(v) if v.to_string().eq_ignore_ascii_case("completed") => {
                ProgressRecordType::Completed
            }
            _ => ProgressRecordType::Processing,
        };
        Self {
            activity_id: int("ActivityId", 0),
            parent_activity_id: int("ParentActivityId", -1),
            activity: text("Activity"),
            status_description: text("StatusDescription"),
            current_operation: obj
                .get("CurrentOperation")
                .filter(|v| !v.is_null())
                .map(Value::to_string),
            percent_complete: int("PercentComplete", -1),
            seconds_remaining: int("SecondsRemaining", -1),
            record_type,
        }
    }
}

/// What a [`ProcessOutputRecord`] carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A plain-text line, without its terminator.
    Text(String),
    Error(ErrorRecord),
    Progress(ProgressRecord),
    Value(Value),
}

impl Payload {
    /// Text of a plain line or of a decoded string value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Value(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorRecord> {
        match self {
            Payload::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// One multiplexed unit of process output.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutputRecord {
    pub stream: StreamKind,
    pub payload: Payload,
}

impl ProcessOutputRecord {
    pub fn new(stream: StreamKind, payload: Payload) -> Self {
        Self { stream, payload }
    }

    pub fn text(stream: StreamKind, line: impl Into<String>) -> Self {
        Self::new(stream, Payload::Text(line.into()))
    }

    pub fn error(record: ErrorRecord) -> Self {
        Self::new(StreamKind::Error, Payload::Error(record))
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
