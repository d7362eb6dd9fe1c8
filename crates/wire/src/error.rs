// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured-protocol decode errors.

use thiserror::Error;

/// Errors decoding one structured-protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("malformed xml: {0}")]
    Xml(String),

    #[error("expected <Objs> document, found <{0}>")]
    UnexpectedRoot(String),

    #[error("unexpected element <{0}>")]
    UnexpectedElement(String),

    #[error("invalid <{element}> value '{text}'")]
    InvalidValue { element: String, text: String },

    #[error("reference to unknown RefId {0}")]
    UnknownRef(String),

    #[error("document ended before all elements were closed")]
    Truncated,

    #[error("line contains no document")]
    Empty,
}

impl WireError {
    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        WireError::Xml(err.to_string())
    }
}
