//! Row queue: single-producer/single-consumer ring of row slots
//!
//! Decouples row conversion (feeder workers) from the real-time row pull
//! (LCD bounce-buffer refill). The producer claims the current write slot,
//! fills it in place and commits it; the consumer copies the oldest
//! committed slot out. Slots are fixed-size (one panel transfer row) and
//! allocated once, so the steady state is allocation-free.
//!
//! Ordering: `commit` publishes with Release, `pull` observes with Acquire,
//! so row bytes written before a commit are visible to the pull side. No
//! locks — each queue has exactly one producer (enforced by the
//! [`LineProducer`] handle) and one consumer (the timing/pull bridge).

use std::cell::UnsafeCell;
use std::fmt;
use std::hint;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Pull was attempted on an empty queue.
///
/// Once real-data mode is armed the pull must never outrun production, so
/// callers on the real-time path treat this as a fatal contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEmpty;

impl fmt::Display for QueueEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row queue empty")
    }
}

impl std::error::Error for QueueEmpty {}

/// Bounded SPSC ring of fixed-size row slots.
pub struct LineQueue {
    slots: Box<[UnsafeCell<Box<[u8]>>]>,
    slot_len: usize,
    /// Rows pulled so far (consumer-owned).
    head: AtomicUsize,
    /// Rows committed so far (producer-owned).
    tail: AtomicUsize,
    /// Guards the single outstanding [`LineProducer`].
    producer_taken: AtomicBool,
    /// Lifetime commit count, for diagnostics and tests.
    committed_total: AtomicUsize,
}

// SAFETY: the UnsafeCell slots are partitioned by the head/tail counters:
// the producer only writes the slot at `tail` (not yet visible to the
// consumer) and the consumer only reads slots in `[head, tail)`. Producer
// exclusivity is enforced by `producer_taken`; consumer exclusivity is a
// documented contract of `pull` (a single bridge drains each queue).
unsafe impl Send for LineQueue {}
// SAFETY: see above.
unsafe impl Sync for LineQueue {}

impl LineQueue {
    /// Ring of `capacity` slots of `slot_len` bytes each.
    pub fn new(capacity: usize, slot_len: usize) -> Self {
        assert!(capacity > 0 && slot_len > 0);
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(vec![0u8; slot_len].into_boxed_slice()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        LineQueue {
            slots,
            slot_len,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            producer_taken: AtomicBool::new(false),
            committed_total: AtomicUsize::new(0),
        }
    }

    /// Bytes per slot.
    pub fn slot_len(&self) -> usize {
        self.slot_len
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Committed rows not yet pulled.
    pub fn len(&self) -> usize {
        self.tail.load(Ordering::Acquire) - self.head.load(Ordering::Acquire)
    }

    /// True when no committed row is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows committed over the queue's lifetime.
    pub fn total_committed(&self) -> usize {
        self.committed_total.load(Ordering::Relaxed)
    }

    /// Take the producer side of the queue.
    ///
    /// Panics if a producer handle is already outstanding: each queue
    /// belongs to exactly one feeder worker.
    pub fn producer(&self) -> LineProducer<'_> {
        let taken = self
            .producer_taken
            .swap(true, Ordering::AcqRel);
        assert!(!taken, "line queue already has a producer");
        LineProducer {
            queue: self,
            _not_sync: PhantomData,
        }
    }

    /// Copy the oldest committed row into `dst` and drop it from the queue.
    ///
    /// Runs in the interrupt-equivalent pull context: no blocking, no
    /// allocation. `dst` must hold at least [`slot_len`](Self::slot_len)
    /// bytes.
    ///
    /// Contract: a single consumer context drains the queue; concurrent
    /// `pull` calls are not supported.
    pub fn pull(&self, dst: &mut [u8]) -> Result<(), QueueEmpty> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return Err(QueueEmpty);
        }
        let idx = head % self.slots.len();
        // SAFETY: `head < tail` means this slot is committed; the producer
        // will not rewrite it before `head` advances past it (ring is
        // bounded by capacity). Single-consumer contract gives us exclusive
        // read access.
        let slot = unsafe { &*self.slots[idx].get() };
        dst[..self.slot_len].copy_from_slice(slot);
        self.head.store(head + 1, Ordering::Release);
        Ok(())
    }
}

/// Producer side of a [`LineQueue`]; at most one exists per queue.
pub struct LineProducer<'q> {
    queue: &'q LineQueue,
    /// Producer state is single-threaded; keep the handle `Send` but not
    /// `Sync`.
    _not_sync: PhantomData<std::cell::Cell<()>>,
}

impl<'q> LineProducer<'q> {
    fn free_slots(&self) -> usize {
        let head = self.queue.head.load(Ordering::Acquire);
        let tail = self.queue.tail.load(Ordering::Relaxed);
        self.queue.slots.len() - (tail - head)
    }

    /// The current write slot, or `None` while the ring is full.
    ///
    /// Repeated calls return the same slot until [`commit`](Self::commit).
    pub fn claim(&mut self) -> Option<&mut [u8]> {
        if self.free_slots() == 0 {
            return None;
        }
        let tail = self.queue.tail.load(Ordering::Relaxed);
        let idx = tail % self.queue.slots.len();
        // SAFETY: slot `idx` is not in `[head, tail)` so the consumer never
        // touches it; `&mut self` on the unique producer handle makes this
        // the only writer.
        let slot = unsafe { &mut *self.queue.slots[idx].get() };
        Some(&mut slot[..])
    }

    /// Like [`claim`](Self::claim), spinning until the consumer frees a
    /// slot. Bounded by the pull rate, which in the steady state is faster
    /// than production.
    pub fn claim_spin(&mut self) -> &mut [u8] {
        while self.free_slots() == 0 {
            hint::spin_loop();
        }
        self.claim().expect("slot available after non-full check")
    }

    /// Publish the claimed slot to the consumer, in FIFO order.
    pub fn commit(&mut self) {
        let tail = self.queue.tail.load(Ordering::Relaxed);
        debug_assert!(
            tail - self.queue.head.load(Ordering::Acquire) < self.queue.slots.len(),
            "commit without a claimable slot"
        );
        self.queue.tail.store(tail + 1, Ordering::Release);
        self.queue.committed_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for LineProducer<'_> {
    fn drop(&mut self) {
        self.queue.producer_taken.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_roundtrip_is_bit_identical_fifo() {
        let q = LineQueue::new(4, 8);
        let mut p = q.producer();

        for row in 0..3u8 {
            let slot = p.claim().unwrap();
            slot.fill(row * 17);
            p.commit();
        }

        let mut buf = [0u8; 8];
        for row in 0..3u8 {
            q.pull(&mut buf).unwrap();
            assert_eq!(buf, [row * 17; 8]);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_pull_empty_fails() {
        let q = LineQueue::new(2, 4);
        let mut buf = [0u8; 4];
        assert_eq!(q.pull(&mut buf), Err(QueueEmpty));
    }

    #[test]
    fn test_claim_on_full_ring_returns_none() {
        let q = LineQueue::new(2, 4);
        let mut p = q.producer();
        for _ in 0..2 {
            p.claim().unwrap();
            p.commit();
        }
        assert!(p.claim().is_none());

        // Draining one row frees one slot.
        let mut buf = [0u8; 4];
        q.pull(&mut buf).unwrap();
        assert!(p.claim().is_some());
    }

    #[test]
    fn test_repeated_claim_returns_same_slot() {
        let q = LineQueue::new(2, 4);
        let mut p = q.producer();
        p.claim().unwrap().fill(0xAB);
        assert_eq!(p.claim().unwrap()[0], 0xAB);
    }

    #[test]
    #[should_panic(expected = "already has a producer")]
    fn test_second_producer_panics() {
        let q = LineQueue::new(2, 4);
        let _a = q.producer();
        let _b = q.producer();
    }

    #[test]
    fn test_producer_handle_is_released_on_drop() {
        let q = LineQueue::new(2, 4);
        drop(q.producer());
        let _again = q.producer();
    }

    #[test]
    fn test_spsc_across_threads() {
        const ROWS: usize = 1000;
        let q = Arc::new(LineQueue::new(8, 4));

        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let mut p = q.producer();
                for row in 0..ROWS {
                    let slot = p.claim_spin();
                    slot.copy_from_slice(&(row as u32).to_le_bytes());
                    p.commit();
                }
            })
        };

        let mut buf = [0u8; 4];
        for row in 0..ROWS {
            while q.is_empty() {
                std::hint::spin_loop();
            }
            q.pull(&mut buf).unwrap();
            assert_eq!(u32::from_le_bytes(buf), row as u32);
        }
        producer.join().unwrap();
        assert_eq!(q.total_committed(), ROWS);
    }
}
