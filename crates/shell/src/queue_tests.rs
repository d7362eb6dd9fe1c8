// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use nx_core::StreamKind;

use super::*;

fn text(line: &str) -> ProcessOutputRecord {
    ProcessOutputRecord::text(StreamKind::Output, line)
}

#[tokio::test]
async fn zero_producers_is_complete_immediately() {
    let queue = OrderedOutputQueue::new(0);
    assert!(queue.is_completed());
    assert_eq!(queue.take().await, None);
}

#[tokio::test]
async fn completes_only_when_last_producer_finishes() {
    let queue = OrderedOutputQueue::new(2);
    queue.push(text("a"));
    queue.producer_finished();
    assert!(!queue.is_completed());
    queue.producer_finished();
    assert!(queue.is_completed());

    assert_eq!(queue.take().await, Some(text("a")));
    assert_eq!(queue.take().await, None);
}

#[test]
fn extra_finish_calls_are_ignored() {
    let queue = OrderedOutputQueue::new(1);
    queue.producer_finished();
    queue.producer_finished();
    assert!(queue.is_completed());
}

#[test]
fn try_take_does_not_block() {
    let queue = OrderedOutputQueue::new(1);
    assert_eq!(queue.try_take(), None);
    queue.push(text("x"));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.try_take(), Some(text("x")));
    assert!(queue.is_empty());
}

#[tokio::test]
async fn take_waits_for_producers() {
    let queue = Arc::new(OrderedOutputQueue::new(1));
    let producer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            for i in 0..50 {
                queue.push(text(&i.to_string()));
                tokio::task::yield_now().await;
            }
            queue.producer_finished();
        })
    };

    let mut seen = Vec::new();
    while let Some(record) = tokio::time::timeout(Duration::from_secs(5), queue.take()).await.unwrap() {
        seen.push(record.payload.as_text().unwrap().to_string());
    }
    producer.await.unwrap();

    let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    assert_eq!(seen, expected);
}
