// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution error types with source-position information.

use nx_core::HostError;

/// Errors that end a native command invocation.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The OS refused to start the process, after all fallbacks.
    #[error("failed to start `{command}`: {message}")]
    LaunchFailed {
        command: String,
        message: String,
        /// Rendered "At line:N char:M" description of the invocation.
        position: String,
        source: std::io::Error,
    },

    /// A non-executable file cannot be activated through the shell from
    /// inside a pipeline.
    #[error("cannot run `{command}`: it is not an executable and the command is part of a pipeline")]
    ActivationDenied { command: String },

    /// The invocation was stopped (pipeline stop or cancellation).
    #[error("the pipeline has been stopped")]
    Stopped,

    /// The host does not support something this invocation needs.
    #[error("not supported: {feature}")]
    NotSupported { feature: String },

    /// A host callback failed.
    #[error("invocation failed: {message}")]
    InvocationFailed { message: String },
}

impl ExecError {
    /// Source-position description attached to this error, if any.
    pub fn source_position(&self) -> Option<&str> {
        match self {
            ExecError::LaunchFailed { position, .. } if !position.is_empty() => Some(position),
            _ => None,
        }
    }
}

impl From<HostError> for ExecError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Stopped => ExecError::Stopped,
            HostError::NotSupported(feature) => ExecError::NotSupported { feature },
            HostError::Failed(message) => ExecError::InvocationFailed { message },
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
