// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion-signaling FIFO between stream readers and the orchestrator.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use nx_core::ProcessOutputRecord;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// FIFO of output records with many producers and a single consumer.
///
/// Each producer calls [`producer_finished`](Self::producer_finished) once
/// at end of stream; the call that brings the count to zero marks the queue
/// complete. [`take`](Self::take) returns `None` only once the queue is
/// complete and empty.
pub struct OrderedOutputQueue {
    items: Mutex<VecDeque<ProcessOutputRecord>>,
    producers: AtomicUsize,
    completed: AtomicBool,
    notify: Notify,
}

impl OrderedOutputQueue {
    /// A queue fed by `producers` streams. With zero producers it starts
    /// complete.
    pub fn new(producers: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            producers: AtomicUsize::new(producers),
            completed: AtomicBool::new(producers == 0),
            notify: Notify::new(),
        }
    }

    pub fn push(&self, record: ProcessOutputRecord) {
        self.items.lock().push_back(record);
        self.notify.notify_one();
    }

    /// One producer reached end of stream.
    pub fn producer_finished(&self) {
        let previous = self
            .producers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.complete();
        }
    }

    /// Mark the queue as receiving no more input.
    pub fn complete(&self) {
        self.completed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Next record, if one is available right now.
    pub fn try_take(&self) -> Option<ProcessOutputRecord> {
        self.items.lock().pop_front()
    }

    /// Wait for the next record; `None` once complete and drained.
    pub async fn take(&self) -> Option<ProcessOutputRecord> {
        loop {
            let notified = self.notify.notified();
            if let Some(record) = self.try_take() {
                return Some(record);
            }
            if self.is_completed() {
                // Records pushed before completion are still visible here.
                return self.try_take();
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
