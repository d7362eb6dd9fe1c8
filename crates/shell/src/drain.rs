// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Continuous chunked reading of a child's output stream.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

/// Size of the read buffer; callbacks never see more than this per chunk.
pub const CHUNK_SIZE: usize = 1024;

/// Reads a byte stream on its own task until EOF, error or cancellation.
///
/// `on_chunk` runs on the reader task for every non-empty read, before the
/// next read is issued, so chunk callbacks of one drainer never overlap.
/// `on_complete` runs exactly once when reading stops for any reason,
/// including the task being dropped with its runtime.
pub struct ByteStreamDrainer {
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl ByteStreamDrainer {
    /// A drainer that was never started; its completion resolves at once.
    pub fn idle() -> Self {
        let finished = CancellationToken::new();
        finished.cancel();
        Self { cancel: CancellationToken::new(), finished }
    }

    /// Start draining `reader`. Must be called within a tokio runtime.
    pub fn start<R, F, C>(reader: R, on_chunk: F, on_complete: C) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        F: FnMut(&[u8]) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self::start_with(reader, CancellationToken::new(), on_chunk, on_complete)
    }

    /// Like [`start`](Self::start), cancelled together with `cancel`.
    pub fn start_with<R, F, C>(reader: R, cancel: CancellationToken, on_chunk: F, on_complete: C) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        F: FnMut(&[u8]) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let finished = CancellationToken::new();
        let guard = Completion { on_complete: Some(on_complete), finished: finished.clone() };
        tokio::spawn(read_loop(reader, cancel.clone(), on_chunk, guard));
        Self { cancel, finished }
    }

    /// Interrupt a pending read and stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    /// Resolves once the read loop has fully stopped and `on_complete` ran.
    pub async fn completion(&self) {
        self.finished.cancelled().await;
    }
}

async fn read_loop<R, F, C>(mut reader: R, cancel: CancellationToken, mut on_chunk: F, guard: Completion<C>)
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
    C: FnOnce(),
{
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            read = reader.read(&mut buf) => read,
        };
        match read {
            Ok(0) => break,
            Ok(n) => on_chunk(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(error = %e, "stream read failed, treating as end of stream");
                break;
            }
        }
    }
    drop(guard);
}

/// Runs the completion callback and marks the drainer finished on drop.
struct Completion<C: FnOnce()> {
    on_complete: Option<C>,
    finished: CancellationToken,
}

impl<C: FnOnce()> Drop for Completion<C> {
    fn drop(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
        self.finished.cancel();
    }
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
