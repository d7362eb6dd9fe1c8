// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured object protocol spoken over a child process's standard streams.
//!
//! A stream that opts in starts with the [`CLIXML_SENTINEL`] line; every
//! following line is one complete `<Objs>` document.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod decode;
mod encode;
mod error;
pub mod escape;

pub use decode::{decode_line, Decoded};
pub use encode::{encode_document, encode_value};
pub use error::WireError;

/// First line of a stream that speaks the structured protocol.
pub const CLIXML_SENTINEL: &str = "#< CLIXML";

/// Opening tag of every protocol document.
pub const OBJS_OPEN: &str =
    r#"<Objs Version="1.1.0.1" xmlns="http://schemas.microsoft.com/powershell/2004/04">"#;

/// Closing tag of every protocol document.
pub const OBJS_CLOSE: &str = "</Objs>";

/// Whether `line` is exactly the protocol sentinel.
pub fn is_sentinel(line: &str) -> bool {
    line == CLIXML_SENTINEL
}
