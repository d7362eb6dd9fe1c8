// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writing host objects to a child's stdin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nx_core::{StreamFormat, TextEncoding, Value};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::format::{Formatter, StringifyFormatter};

type Stdin = Box<dyn AsyncWrite + Unpin + Send>;

/// Which wire format the writer speaks, with its per-format state.
pub enum InputFormatState {
    /// Formatted text lines.
    Text(Box<dyn Formatter>),
    /// One protocol document per line, after the sentinel.
    Xml,
}

/// Cloneable flag that makes a writer drop further input.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Feeds a child's stdin from the host pipeline.
///
/// Write failures mean the child stopped reading (usually because it
/// exited); the writer then disposes itself and drops all further input.
pub struct ProcessInputWriter {
    stdin: Option<Stdin>,
    state: Option<InputFormatState>,
    formatter: Option<Box<dyn Formatter>>,
    encoding: TextEncoding,
    stopped: StopFlag,
    disposed: bool,
}

impl Default for ProcessInputWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInputWriter {
    pub fn new() -> Self {
        Self {
            stdin: None,
            state: None,
            formatter: None,
            encoding: TextEncoding::Utf8,
            stopped: StopFlag::default(),
            disposed: false,
        }
    }

    /// Use `formatter` instead of [`StringifyFormatter`] for text input.
    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Begin writing to `stdin`. In structured mode the sentinel line is
    /// written first.
    pub async fn start<W>(&mut self, stdin: W, format: StreamFormat, encoding: TextEncoding)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.stdin = Some(Box::new(stdin));
        self.encoding = encoding;
        self.state = Some(match format {
            StreamFormat::Text => InputFormatState::Text(
                self.formatter.take().unwrap_or_else(|| Box::new(StringifyFormatter::new())),
            ),
            StreamFormat::Xml => InputFormatState::Xml,
        });
        if format == StreamFormat::Xml {
            self.write_line(nx_wire::CLIXML_SENTINEL).await;
        }
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stopped.clone()
    }

    /// Drop all further input.
    pub fn stop(&self) {
        self.stopped.stop();
    }

    pub fn is_active(&self) -> bool {
        !self.disposed && !self.stopped.is_stopped() && self.stdin.is_some()
    }

    /// Write one value; silently ignored once stopped or disposed.
    pub async fn add(&mut self, value: &Value) {
        if !self.is_active() {
            return;
        }
        let lines = match &mut self.state {
            Some(InputFormatState::Text(formatter)) => formatter.format(value),
            Some(InputFormatState::Xml) => vec![nx_wire::encode_document(None, value)],
            None => return,
        };
        for line in lines {
            if !self.write_line(&line).await {
                break;
            }
        }
    }

    /// Upstream finished: write held-back text, then close stdin.
    pub async fn done(&mut self) {
        if self.is_active() {
            let tail = match &mut self.state {
                Some(InputFormatState::Text(formatter)) => formatter.finish(),
                _ => Vec::new(),
            };
            for line in tail {
                if !self.write_line(&line).await {
                    break;
                }
            }
            if let Some(stdin) = &mut self.stdin {
                if let Err(e) = stdin.shutdown().await {
                    tracing::debug!(error = %e, "closing child stdin failed");
                }
            }
        }
        self.dispose();
    }

    /// Release stdin and the format state. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.stdin = None;
        self.state = None;
    }

    /// Write `line` plus newline and flush; returns false (and disposes) if
    /// the child is gone.
    async fn write_line(&mut self, line: &str) -> bool {
        let Some(stdin) = &mut self.stdin else {
            return false;
        };
        let bytes = self.encoding.encode(&format!("{line}\n"));
        let result = async {
            stdin.write_all(&bytes).await?;
            stdin.flush().await
        }
        .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "child stdin closed, dropping further input");
                self.dispose();
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
