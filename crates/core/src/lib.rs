// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nx-core: records, values and collaborator interfaces shared by the
//! native-exec crates.

pub mod macros;

pub mod config;
pub mod host;
pub mod invocation;
pub mod position;
pub mod record;
pub mod stream;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{ArgumentPassing, ConfigError, ExecutionContext, NativeConfig, Platform, Preferences};
pub use host::{ConsoleBuffer, Coordinates, Host, HostError, TextEncoding};
pub use invocation::{
    ArgumentList, CommandKind, Consumer, Invocation, PipelinePosition, StreamFormat,
    DEFAULT_SINK_NAME,
};
pub use position::{SourcePosition, Span};
pub use record::{
    ErrorCategory, ErrorRecord, Payload, ProcessOutputRecord, ProgressRecord, ProgressRecordType,
};
pub use stream::StreamKind;
pub use value::{PsObject, Value};
