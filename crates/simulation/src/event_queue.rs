//! Time-ordered event queues.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::time::Duration;

/// Key that orders events: by time, then by scheduling sequence.
///
/// The sequence breaks ties between events at the same time in the order
/// they were scheduled, which keeps runs deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    /// Simulation time the event fires at.
    pub time: Duration,
    /// Monotonic scheduling sequence number.
    pub sequence: u64,
}

/// Queue storage, selected by the scheduling algorithm.
#[derive(Debug)]
pub(crate) enum EventQueue<E> {
    Calendar(BTreeMap<EventKey, E>),
    Heap(BinaryHeap<Reverse<HeapEntry<E>>>),
}

impl<E> EventQueue<E> {
    pub(crate) fn push(&mut self, key: EventKey, event: E) {
        match self {
            EventQueue::Calendar(map) => {
                map.insert(key, event);
            }
            EventQueue::Heap(heap) => heap.push(Reverse(HeapEntry { key, event })),
        }
    }

    pub(crate) fn pop(&mut self) -> Option<(EventKey, E)> {
        match self {
            EventQueue::Calendar(map) => map.pop_first(),
            EventQueue::Heap(heap) => heap.pop().map(|Reverse(entry)| (entry.key, entry.event)),
        }
    }

    pub(crate) fn peek_key(&self) -> Option<EventKey> {
        match self {
            EventQueue::Calendar(map) => map.keys().next().copied(),
            EventQueue::Heap(heap) => heap.peek().map(|Reverse(entry)| entry.key),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            EventQueue::Calendar(map) => map.len(),
            EventQueue::Heap(heap) => heap.len(),
        }
    }
}

/// Heap entry ordered by key only.
#[derive(Debug)]
pub(crate) struct HeapEntry<E> {
    key: EventKey,
    event: E,
}

impl<E> PartialEq for HeapEntry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<E> Eq for HeapEntry<E> {}

impl<E> PartialOrd for HeapEntry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for HeapEntry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
