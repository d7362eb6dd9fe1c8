// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! nx-shell: launching native programs and shuttling their I/O.
//!
//! [`NativeCommand`] ties the pieces together: redirection is decided by
//! [`redirect`], the process is started by [`launch`], stdout and stderr are
//! read by a [`ProcessOutputMultiplexer`] and stdin is fed by a
//! [`ProcessInputWriter`].

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod command;
pub mod console;
pub mod drain;
pub mod env;
pub mod error;
pub mod format;
pub mod input;
pub mod launch;
pub mod multiplex;
pub mod platform;
pub mod queue;
pub mod redirect;
pub mod scrape;
pub mod terminate;

pub use command::{CommandState, ExitOutcome, NativeCommand, StopHandle};
pub use console::ConsolePlan;
pub use drain::ByteStreamDrainer;
pub use error::ExecError;
pub use format::{Formatter, StringifyFormatter};
pub use input::{InputFormatState, ProcessInputWriter, StopFlag};
pub use launch::{launch, LaunchRequest, ProcessHandle};
pub use multiplex::{LineClassifier, LineState, ProcessOutputMultiplexer};
pub use platform::{BinaryKind, PlatformCapabilities};
pub use queue::OrderedOutputQueue;
pub use redirect::{RedirectContext, Redirection};
pub use scrape::capture_region;
pub use terminate::{ProcessTerminator, SystemTerminator};
