//! # Queue Operation Tests
//!
//! End-to-end coverage of the non-blocking queue contract on a fresh
//! directory: FIFO ordering, capacity accounting, peek purity, draining,
//! and the capacity stored on disk winning over the configured one.

use mmapq::{JsonSerializer, PersistentQueue, QueueBuilder, StringSerializer};
use tempfile::tempdir;

const PAGE_SIZE: u64 = 1 << 19;

fn string_queue(path: &std::path::Path, capacity: u32) -> PersistentQueue<StringSerializer> {
    QueueBuilder::new(path, StringSerializer)
        .capacity(capacity)
        .page_size(PAGE_SIZE)
        .open()
        .unwrap()
}

#[test]
fn puts_fill_to_capacity_then_offer_is_refused() {
    let dir = tempdir().unwrap();
    let queue = string_queue(&dir.path().join("q"), 3);

    queue.put(&"a".to_string()).unwrap();
    assert_eq!(queue.len(), 1);
    queue.put(&"b".to_string()).unwrap();
    assert_eq!(queue.len(), 2);
    queue.put(&"c".to_string()).unwrap();
    assert_eq!(queue.len(), 3);

    assert!(!queue.offer(&"d".to_string()).unwrap());
    assert_eq!(queue.len(), 3);
}

#[test]
fn peek_then_poll_then_poll_empty() {
    let dir = tempdir().unwrap();
    let queue = string_queue(&dir.path().join("q"), 16);

    queue.put(&"x".to_string()).unwrap();

    assert_eq!(queue.peek().unwrap(), Some("x".to_string()));
    assert_eq!(queue.poll().unwrap(), Some("x".to_string()));
    assert_eq!(queue.poll().unwrap(), None);
}

#[test]
fn elements_come_out_in_insertion_order() {
    let dir = tempdir().unwrap();
    let queue = string_queue(&dir.path().join("q"), 256);
    let elements: Vec<String> = (0..100).map(|i| format!("element-{i:03}")).collect();

    for element in &elements {
        queue.put(element).unwrap();
    }

    let mut polled = Vec::new();
    while let Some(element) = queue.poll().unwrap() {
        polled.push(element);
    }
    assert_eq!(polled, elements);
}

#[test]
fn interleaved_puts_and_polls_preserve_order() {
    // Two puts per poll nets one element a round; capacity must cover the
    // thirty-element peak or the final puts would block.
    let dir = tempdir().unwrap();
    let queue = string_queue(&dir.path().join("q"), 64);
    let mut polled = Vec::new();

    for round in 0..30 {
        queue.put(&format!("a{round}")).unwrap();
        queue.put(&format!("b{round}")).unwrap();
        polled.push(queue.poll().unwrap().unwrap());
    }
    while let Some(element) = queue.poll().unwrap() {
        polled.push(element);
    }

    let expected: Vec<String> = (0..30)
        .flat_map(|round| [format!("a{round}"), format!("b{round}")])
        .collect();
    assert_eq!(polled, expected);
}

#[test]
fn repeated_peeks_match_the_take_and_size_drops_once() {
    let dir = tempdir().unwrap();
    let queue = string_queue(&dir.path().join("q"), 16);
    queue.put(&"stable".to_string()).unwrap();

    let first = queue.peek().unwrap();
    let second = queue.peek().unwrap();
    let taken = queue.take().unwrap();

    assert_eq!(first, Some("stable".to_string()));
    assert_eq!(second, Some("stable".to_string()));
    assert_eq!(taken, "stable");
    assert_eq!(queue.len(), 0);
}

#[test]
fn drain_moves_prefix_and_reports_count() {
    let dir = tempdir().unwrap();
    let queue = QueueBuilder::new(dir.path().join("q"), JsonSerializer::<i32>::new())
        .capacity(5)
        .page_size(PAGE_SIZE)
        .open()
        .unwrap();
    for value in 1..=5 {
        queue.put(&value).unwrap();
    }

    let mut list = Vec::new();
    let drained = queue.drain_to(&mut list, 3).unwrap();

    assert_eq!(drained, 3);
    assert_eq!(list, [1, 2, 3]);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.remaining_capacity(), 3);
}

#[test]
fn drain_stops_at_queue_size() {
    let dir = tempdir().unwrap();
    let queue = string_queue(&dir.path().join("q"), 16);
    queue.put(&"a".to_string()).unwrap();
    queue.put(&"b".to_string()).unwrap();

    let mut list = Vec::new();
    let drained = queue.drain_to(&mut list, 10).unwrap();

    assert_eq!(drained, 2);
    assert_eq!(list, ["a", "b"]);
    assert!(queue.is_empty());
}

#[test]
fn stored_capacity_wins_over_configured_capacity() {
    let dir = tempdir().unwrap();
    let queue_dir = dir.path().join("q");
    drop(string_queue(&queue_dir, 10));

    let reopened = string_queue(&queue_dir, 99);

    assert_eq!(reopened.capacity(), 10);
}

#[test]
fn size_never_exceeds_capacity() {
    let dir = tempdir().unwrap();
    let queue = string_queue(&dir.path().join("q"), 2);

    for i in 0..10 {
        queue.offer(&format!("e{i}")).unwrap();
        assert!(queue.len() <= 2);
    }
    assert_eq!(queue.len(), 2);
}

#[test]
fn snapshot_observes_without_consuming() {
    let dir = tempdir().unwrap();
    let queue = string_queue(&dir.path().join("q"), 16);
    for name in ["p", "q", "r"] {
        queue.put(&name.to_string()).unwrap();
    }

    let snapshot = queue.snapshot().unwrap();

    assert_eq!(snapshot, ["p", "q", "r"]);
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.poll().unwrap(), Some("p".to_string()));
}
