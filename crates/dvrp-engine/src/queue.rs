//! `EventQueue` — the future-event set of the simulation.
//!
//! A binary min-heap keyed by `(SimTime, seq)`.  The sequence number is a
//! monotonically increasing counter assigned at push time, so entries
//! scheduled at the same instant dispatch in FIFO order — the ordering
//! guarantee every other component builds on.
//!
//! # Cancellation
//!
//! Every push returns a [`TimerId`].  `cancel` marks the id dead in O(1);
//! the heap entry itself is dropped lazily when it reaches the top.  A
//! pending-id set distinguishes live timers from already-popped ones, so a
//! stale cancel is a reported no-op rather than a corruption.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use dvrp_core::SimTime;

/// Handle to one scheduled wake-up, usable to cancel it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TimerId(u64);

struct Entry<T> {
    time: SimTime,
    seq: u64,
    timer: TimerId,
    payload: T,
}

// Ordering looks at `(time, seq)` only; `seq` is unique, so the order is
// total and `payload` never needs to be comparable.

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// The future-event set: wake-ups ordered by `(time, FIFO seq)`.
pub struct EventQueue<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    /// Timers pushed and neither popped nor canceled yet.
    pending: HashSet<TimerId>,
    /// Canceled timers whose heap entry has not surfaced yet.
    canceled: HashSet<TimerId>,
    next_seq: u64,
    next_timer: u64,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            canceled: HashSet::new(),
            next_seq: 0,
            next_timer: 0,
        }
    }

    /// Schedule `payload` to pop once the clock reaches `at`.
    pub fn push(&mut self, at: SimTime, payload: T) -> TimerId {
        let timer = TimerId(self.next_timer);
        self.next_timer += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry { time: at, seq, timer, payload }));
        self.pending.insert(timer);
        timer
    }

    /// Cancel a pending wake-up.  Returns `false` if the timer already
    /// popped or was already canceled.  Canceling never disturbs the
    /// ordering of other entries.
    pub fn cancel(&mut self, timer: TimerId) -> bool {
        if self.pending.remove(&timer) {
            self.canceled.insert(timer);
            true
        } else {
            false
        }
    }

    /// Remove and return the earliest live entry.
    pub fn pop(&mut self) -> Option<(SimTime, T)> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            if self.canceled.remove(&entry.timer) {
                continue;
            }
            self.pending.remove(&entry.timer);
            return Some((entry.time, entry.payload));
        }
        None
    }

    /// The instant of the earliest live entry, if any.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        self.prune();
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Number of live (not canceled) entries.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop canceled entries sitting at the top of the heap.
    fn prune(&mut self) {
        loop {
            let dead = match self.heap.peek() {
                Some(Reverse(entry)) => self.canceled.contains(&entry.timer),
                None => false,
            };
            if !dead {
                break;
            }
            let Reverse(entry) = self.heap.pop().expect("peeked entry");
            self.canceled.remove(&entry.timer);
        }
    }
}
