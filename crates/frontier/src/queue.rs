use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use priority_queue::PriorityQueue;
use tokio::sync::Mutex;

use feedcrawl_core::Request;

/// Ordering key: lower `priority` sorts earlier, FIFO among equals
/// (spec §4.4). `priority_queue` is a max-heap, so both fields are
/// negated — the largest `(neg_priority, neg_sequence)` tuple is the
/// smallest original `(priority, sequence)` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Key(i64, i64);

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0, self.1).cmp(&(other.0, other.1))
    }
}

/// URL-keyed slot in the queue (the queue owns exactly one pending
/// Request per normalized URL at a time — duplicate suppression happens
/// upstream in the [`crate::DuplicateFilter`]).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct Slot(String);

struct Inner {
    heap: PriorityQueue<Slot, Key>,
    jobs: HashMap<String, Request>,
}

/// Min-heap over pending requests, FIFO tiebreak (spec §4.4).
/// Non-blocking; callers own their own wait/condvar logic.
pub struct FrontierQueue {
    inner: Mutex<Inner>,
    sequence: AtomicU64,
}

impl Default for FrontierQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontierQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: PriorityQueue::new(),
                jobs: HashMap::new(),
            }),
            sequence: AtomicU64::new(0),
        }
    }

    pub async fn push(&self, req: Request) {
        let seq = self.sequence.fetch_add(1, AtomicOrdering::Relaxed) as i64;
        let key = Key(-(req.priority as i64), -seq);
        let slot = Slot(req.url.to_string());
        let mut inner = self.inner.lock().await;
        inner.jobs.insert(slot.0.clone(), req);
        inner.heap.push(slot, key);
    }

    pub async fn pop(&self) -> Option<Request> {
        let mut inner = self.inner.lock().await;
        let (slot, _) = inner.heap.pop()?;
        inner.jobs.remove(&slot.0)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.heap.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.heap.is_empty()
    }
}
