//! Shared per-update state between orchestrator, feeders and bridge
//!
//! One [`RenderContext`] lives for the pipeline's lifetime. Single-writer
//! rules per field: `lines_prepared` is the only field multiple workers
//! mutate (atomic claim cursor); `lines_consumed` is advanced only by the
//! bridge in its pull context; the conversion table is written only by the
//! orchestrator between frames; error flags accumulate from any side and
//! are drained once per cycle.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::RwLock;

use epd_waveform::DrawError;

use crate::line_queue::LineQueue;
use crate::panel::{PanelGeometry, LINE_QUEUE_LEN};
use crate::sync::Semaphore;

/// `line_threads` entry for a row not yet claimed this frame.
pub(crate) const NO_WORKER: u8 = u8::MAX;

/// Long-lived pipeline state shared across the three execution contexts.
pub struct RenderContext {
    geometry: PanelGeometry,
    /// One SPSC queue per feeder worker.
    queues: Vec<LineQueue>,
    /// Which worker produced each row of the current frame.
    line_threads: Box<[AtomicU8]>,
    /// Claim cursor; reset at frame start, fetch-add claimed by workers.
    lines_prepared: AtomicUsize,
    /// Rows delivered to hardware this frame; bridge-owned.
    pub(crate) lines_consumed: AtomicUsize,
    /// Frame-scoped conversion table. Written by the orchestrator before
    /// workers are released, read by workers during the frame.
    pub(crate) conversion_lut: RwLock<Vec<u8>>,
    /// Cycle-wide accumulated error flags.
    errors: AtomicU32,
    /// Ensures transmission is armed exactly once per frame.
    frame_armed: AtomicBool,
    /// Raised by the bridge when the pulse generator finishes a frame loop.
    pub(crate) frame_done: Semaphore,
    /// Raised once per worker per frame when all claimable rows are done.
    pub(crate) feed_done: Semaphore,
    /// Per-worker frame release, the "unpark" side of the feeder loop.
    pub(crate) frame_start: Vec<Semaphore>,
}

impl RenderContext {
    /// Context for `geometry` fed by `workers` parallel row converters.
    pub fn new(geometry: PanelGeometry, workers: usize) -> Self {
        assert!(
            workers > 0 && workers < NO_WORKER as usize,
            "worker count out of range"
        );
        let queues = (0..workers)
            .map(|_| LineQueue::new(LINE_QUEUE_LEN, geometry.line_bytes()))
            .collect();
        let line_threads = (0..geometry.frame_lines())
            .map(|_| AtomicU8::new(NO_WORKER))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        RenderContext {
            geometry,
            queues,
            line_threads,
            lines_prepared: AtomicUsize::new(0),
            lines_consumed: AtomicUsize::new(0),
            conversion_lut: RwLock::new(Vec::new()),
            errors: AtomicU32::new(0),
            frame_armed: AtomicBool::new(false),
            frame_done: Semaphore::new(0),
            feed_done: Semaphore::new(0),
            frame_start: (0..workers).map(|_| Semaphore::new(0)).collect(),
        }
    }

    /// Panel geometry this context serves.
    pub fn geometry(&self) -> PanelGeometry {
        self.geometry
    }

    /// Number of feeder workers (= row queues).
    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    pub(crate) fn queue(&self, worker: usize) -> &LineQueue {
        &self.queues[worker]
    }

    /// Reset the frame-scoped counters and the row→worker map.
    ///
    /// Called by the orchestrator before releasing workers; nothing else
    /// runs at that point, so plain stores suffice.
    pub(crate) fn begin_frame(&self) {
        self.lines_prepared.store(0, Ordering::Relaxed);
        self.lines_consumed.store(0, Ordering::Relaxed);
        self.frame_armed.store(false, Ordering::Relaxed);
        for slot in self.line_threads.iter() {
            slot.store(NO_WORKER, Ordering::Relaxed);
        }
    }

    /// Claim the next unclaimed row index of the frame.
    ///
    /// Totally ordered across workers; each index is handed out exactly
    /// once per frame.
    pub(crate) fn claim_line(&self) -> usize {
        self.lines_prepared.fetch_add(1, Ordering::Relaxed)
    }

    /// Record that `worker` produces row `row` this frame. Published with
    /// Release so the bridge's map read pairs with the queue commit.
    pub(crate) fn record_producer(&self, row: usize, worker: u8) {
        self.line_threads[row].store(worker, Ordering::Release);
    }

    /// The worker that claimed `row`, if any has yet.
    pub(crate) fn producer_of(&self, row: usize) -> Option<usize> {
        match self.line_threads[row].load(Ordering::Acquire) {
            NO_WORKER => None,
            worker => Some(worker as usize),
        }
    }

    /// Rows claimed so far this frame (may exceed the frame's row count
    /// once all workers have hit the end).
    pub fn lines_prepared(&self) -> usize {
        self.lines_prepared.load(Ordering::Relaxed)
    }

    /// Rows delivered to hardware so far this frame.
    pub fn lines_consumed(&self) -> usize {
        self.lines_consumed.load(Ordering::Relaxed)
    }

    /// Snapshot of the row→worker map for the most recent frame. Rows
    /// never claimed are `None`. Inspection only.
    pub fn producer_map(&self) -> Vec<Option<usize>> {
        (0..self.line_threads.len())
            .map(|row| self.producer_of(row))
            .collect()
    }

    /// Rows `worker` has committed over the context's lifetime.
    pub fn committed_rows(&self, worker: usize) -> usize {
        self.queues[worker].total_committed()
    }

    /// Latch frame arming; true for exactly one caller per frame.
    pub(crate) fn try_arm(&self) -> bool {
        !self.frame_armed.swap(true, Ordering::AcqRel)
    }

    /// OR `err` into the cycle accumulator. Flags are never cleared
    /// mid-cycle.
    pub(crate) fn record_error(&self, err: DrawError) {
        if !err.is_ok() {
            self.errors.fetch_or(err.bits(), Ordering::Relaxed);
        }
    }

    /// Drain the accumulated flags at cycle end.
    pub(crate) fn take_errors(&self) -> DrawError {
        DrawError::from_bits(self.errors.swap(0, Ordering::Relaxed))
    }
}
