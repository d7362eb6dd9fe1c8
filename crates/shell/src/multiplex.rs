// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line classification and multiplexing of a child's stdout and stderr.
//!
//! Each stream runs its own [`LineClassifier`]. A stream whose first line is
//! the protocol sentinel switches to structured mode for good; any other
//! first line pins it to plain text. Records are pushed onto the shared
//! [`OrderedOutputQueue`] in the order lines arrive on each stream.

use std::sync::Arc;

use nx_core::{ErrorRecord, ProcessOutputRecord, StreamKind};
use parking_lot::Mutex;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::drain::ByteStreamDrainer;
use crate::queue::OrderedOutputQueue;

/// Per-stream classification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    AwaitingFirstLine,
    PlainText,
    Protocol,
    Closed,
}

/// Turns the lines of one stream into output records.
#[derive(Debug)]
pub struct LineClassifier {
    stream: StreamKind,
    file_name: String,
    state: LineState,
    plain_error_lines: usize,
}

impl LineClassifier {
    /// Classifier for `stream` (Output or Error) of the program `file_name`.
    pub fn new(stream: StreamKind, file_name: impl Into<String>) -> Self {
        Self {
            stream,
            file_name: file_name.into(),
            state: LineState::AwaitingFirstLine,
            plain_error_lines: 0,
        }
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    pub fn classify(&mut self, line: &str) -> Vec<ProcessOutputRecord> {
        match self.state {
            LineState::AwaitingFirstLine if nx_wire::is_sentinel(line) => {
                tracing::debug!(stream = %self.stream, program = %self.file_name, "structured protocol detected");
                self.state = LineState::Protocol;
                Vec::new()
            }
            LineState::AwaitingFirstLine => {
                self.state = LineState::PlainText;
                vec![self.plain(line)]
            }
            LineState::PlainText => vec![self.plain(line)],
            LineState::Protocol => self.decode(line),
            LineState::Closed => Vec::new(),
        }
    }

    pub fn close(&mut self) {
        self.state = LineState::Closed;
    }

    fn plain(&mut self, line: &str) -> ProcessOutputRecord {
        if self.stream != StreamKind::Error {
            return ProcessOutputRecord::text(self.stream, line);
        }
        self.plain_error_lines += 1;
        let record = if self.plain_error_lines == 1 {
            ErrorRecord::native_error(line)
        } else {
            ErrorRecord::native_error_continuation(line)
        };
        ProcessOutputRecord::error(record)
    }

    fn decode(&self, line: &str) -> Vec<ProcessOutputRecord> {
        match nx_wire::decode_line(line) {
            Ok(objects) => objects.into_iter().map(|o| o.into_record(self.stream)).collect(),
            Err(e) => {
                tracing::warn!(stream = %self.stream, program = %self.file_name, error = %e, "failed to decode structured output");
                let reason = e.to_string();
                vec![ProcessOutputRecord::error(ErrorRecord::parse_failed(
                    self.stream,
                    &self.file_name,
                    &reason,
                ))]
            }
        }
    }
}

/// Splits a chunked byte stream into lines.
///
/// Lines end at `\n`; one trailing `\r` is dropped and invalid UTF-8 is
/// replaced.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Complete lines contained in `chunk` plus anything held back.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(take_line(&mut self.pending));
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// Unterminated final line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(take_line(&mut self.pending))
        }
    }
}

fn take_line(pending: &mut Vec<u8>) -> String {
    if pending.last() == Some(&b'\r') {
        pending.pop();
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    line
}

/// Reader state for one stream, shared by its drainer callbacks.
struct StreamReader {
    splitter: LineSplitter,
    classifier: LineClassifier,
    queue: Arc<OrderedOutputQueue>,
}

impl StreamReader {
    fn on_chunk(&mut self, chunk: &[u8]) {
        for line in self.splitter.push(chunk) {
            self.emit(&line);
        }
    }

    fn on_end(&mut self) {
        if let Some(line) = self.splitter.finish() {
            self.emit(&line);
        }
        self.classifier.close();
        self.queue.producer_finished();
    }

    fn emit(&mut self, line: &str) {
        for record in self.classifier.classify(line) {
            self.queue.push(record);
        }
    }
}

/// Reader tasks for a child's redirected stdout and stderr.
pub struct ProcessOutputMultiplexer {
    queue: Arc<OrderedOutputQueue>,
    drainers: Vec<ByteStreamDrainer>,
}

impl ProcessOutputMultiplexer {
    /// Start one reader task per present stream. The queue completes once
    /// every started reader has seen end of stream (immediately if none).
    pub fn start<O, E>(
        stdout: Option<O>,
        stderr: Option<E>,
        file_name: &str,
        cancel: CancellationToken,
    ) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let producers = usize::from(stdout.is_some()) + usize::from(stderr.is_some());
        let queue = Arc::new(OrderedOutputQueue::new(producers));
        let mut drainers = Vec::with_capacity(producers);
        if let Some(stdout) = stdout {
            drainers.push(attach(stdout, StreamKind::Output, file_name, &queue, &cancel));
        }
        if let Some(stderr) = stderr {
            drainers.push(attach(stderr, StreamKind::Error, file_name, &queue, &cancel));
        }
        Self { queue, drainers }
    }

    pub fn queue(&self) -> &Arc<OrderedOutputQueue> {
        &self.queue
    }

    /// Cancel all reader tasks; the queue completes as they stop.
    pub fn stop(&self) {
        for drainer in &self.drainers {
            drainer.cancel();
        }
    }

    /// Wait for every reader task to finish.
    pub async fn finished(&self) {
        for drainer in &self.drainers {
            drainer.completion().await;
        }
    }
}

fn attach<R>(
    reader: R,
    stream: StreamKind,
    file_name: &str,
    queue: &Arc<OrderedOutputQueue>,
    cancel: &CancellationToken,
) -> ByteStreamDrainer
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let state = Arc::new(Mutex::new(StreamReader {
        splitter: LineSplitter::default(),
        classifier: LineClassifier::new(stream, file_name),
        queue: Arc::clone(queue),
    }));
    let on_end = Arc::clone(&state);
    ByteStreamDrainer::start_with(
        reader,
        cancel.child_token(),
        move |chunk| state.lock().on_chunk(chunk),
        move || on_end.lock().on_end(),
    )
}

#[cfg(test)]
#[path = "multiplex_tests.rs"]
mod tests;
