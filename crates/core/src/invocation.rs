// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What the command-binding layer hands over when it dispatches a native
//! command: the resolved program, its arguments and where it sits in the
//! host pipeline.

use serde::{Deserialize, Serialize};

use crate::position::SourcePosition;

/// Name of the host's implicit default-output command.
pub const DEFAULT_SINK_NAME: &str = "Out-Default";

/// How a pipeline consumer was defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Shipped with the host.
    Builtin,
    /// User-authored function.
    Function,
    Script,
    Application,
}

/// The command receiving this command's output (or error) stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub name: String,
    pub kind: CommandKind,
}

impl Consumer {
    pub fn builtin(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: CommandKind::Builtin }
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: CommandKind::Function }
    }

    /// The host's own default outputter.
    pub fn default_sink() -> Self {
        Self::builtin(DEFAULT_SINK_NAME)
    }

    /// True when this consumer is the host's default outputter.
    ///
    /// Detection is by name. A user function that happens to be called
    /// `Out-Default` is a deliberate redirection, so only the built-in
    /// command counts.
    pub fn is_default_sink(&self) -> bool {
        self.kind == CommandKind::Builtin && self.name.eq_ignore_ascii_case(DEFAULT_SINK_NAME)
    }
}

/// Where the command sits in the host pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePosition {
    pub is_first: bool,
    pub is_last: bool,
    /// Downstream consumer of the output stream, `None` when captured
    /// (e.g. assigned to a variable).
    pub output_consumer: Option<Consumer>,
    /// Consumer of the error stream.
    pub error_consumer: Option<Consumer>,
    /// Error stream merged into output (`2>&1`).
    pub error_merged: bool,
}

impl PipelinePosition {
    /// Typed at the prompt on its own: both streams go to the default outputter.
    pub fn interactive() -> Self {
        Self {
            is_first: true,
            is_last: true,
            output_consumer: Some(Consumer::default_sink()),
            error_consumer: Some(Consumer::default_sink()),
            error_merged: false,
        }
    }

    /// Sole command whose output is captured by the host.
    pub fn captured() -> Self {
        Self {
            is_first: true,
            is_last: true,
            output_consumer: None,
            error_consumer: None,
            error_merged: false,
        }
    }

    /// A stage of a longer pipeline.
    pub fn stage(is_first: bool, is_last: bool, output_consumer: Option<Consumer>) -> Self {
        Self {
            is_first,
            is_last,
            output_consumer,
            error_consumer: Some(Consumer::default_sink()),
            error_merged: false,
        }
    }

    pub fn with_error_merged(mut self) -> Self {
        self.error_merged = true;
        self
    }

    pub fn with_error_consumer(mut self, consumer: Option<Consumer>) -> Self {
        self.error_consumer = consumer;
        self
    }

    /// Not piped from or into anything.
    pub fn is_solo(&self) -> bool {
        self.is_first && self.is_last
    }
}

impl Default for PipelinePosition {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Wire format for data exchanged over stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    #[default]
    Text,
    Xml,
}

/// Argument representation handed to the OS; the two forms are exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentList {
    /// One pre-quoted command-line string.
    Legacy(String),
    /// Discrete argv entries.
    Discrete(Vec<String>),
}

/// A resolved native command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command_path: String,
    pub arguments: Vec<String>,
    /// Pre-escaped argument string, if the binder produced one.
    pub raw_arguments: Option<String>,
    pub expects_input: bool,
    pub position: PipelinePosition,
    pub input_format: StreamFormat,
    /// Host's current provider location.
    pub location: String,
    pub source_position: SourcePosition,
}

impl Invocation {
    pub fn new(command_path: impl Into<String>) -> Self {
        let command_path = command_path.into();
        Self {
            source_position: SourcePosition::command_line(command_path.clone()),
            command_path,
            arguments: Vec::new(),
            raw_arguments: None,
            expects_input: false,
            position: PipelinePosition::interactive(),
            input_format: StreamFormat::Text,
            location: String::new(),
        }
    }

    crate::setters! {
        into {
            location: String,
            source_position: SourcePosition,
        }
        set {
            expects_input: bool,
            position: PipelinePosition,
            input_format: StreamFormat,
        }
        option {
            raw_arguments: String,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    /// Final path component of the command, used in messages.
    pub fn file_name(&self) -> String {
        std::path::Path::new(&self.command_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.command_path.clone())
    }
}

#[cfg(test)]
#[path = "invocation_tests.rs"]
mod tests;
