//! Timing/pull bridge: the hardware-facing hand-off
//!
//! The transfer engine calls in from its interrupt-equivalent context:
//! [`DisplayBridge::fill_line`] whenever its bounce buffer runs dry, and
//! [`DisplayBridge::on_loop_end`] when the pulse generator completes a
//! frame loop. Neither entry point blocks or allocates.
//!
//! The active line source is either a constant fill byte or the row
//! queues. Switch requests are only ever *applied* at a strobe boundary
//! (loop end or frame arming), so one electrical frame can never mix
//! solid and real rows.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use crate::context::RenderContext;
use crate::engine::TransferEngine;

/// Where the pull callback takes its row bytes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    /// Every row is `memset` to this byte; feeders are bypassed.
    Solid(u8),
    /// Rows come from the feeder queues, in ascending row order.
    Queues,
}

const SOURCE_QUEUES: u16 = 0x100;
const PENDING_NONE: u16 = u16::MAX;

impl LineSource {
    fn encode(self) -> u16 {
        match self {
            LineSource::Solid(byte) => byte as u16,
            LineSource::Queues => SOURCE_QUEUES,
        }
    }

    fn decode(raw: u16) -> Self {
        if raw == SOURCE_QUEUES {
            LineSource::Queues
        } else {
            LineSource::Solid(raw as u8)
        }
    }
}

type FrameCallback = Box<dyn Fn() + Send + Sync>;

/// Bridge between the pipeline's queues and the transfer engine.
pub struct DisplayBridge {
    ctx: Arc<RenderContext>,
    frame_lines: usize,
    visible_lines: usize,
    active: AtomicU16,
    pending: AtomicU16,
    /// Invoked at each loop end, after the pending switch is applied. The
    /// lock is only contended when a callback is (un)registered, which
    /// never happens mid-frame.
    frame_cb: Mutex<Option<FrameCallback>>,
}

impl DisplayBridge {
    /// Bridge for `ctx`, starting out as a no-drive solid source.
    pub fn new(ctx: Arc<RenderContext>) -> Self {
        let geometry = ctx.geometry();
        DisplayBridge {
            ctx,
            frame_lines: geometry.frame_lines(),
            visible_lines: geometry.height,
            active: AtomicU16::new(LineSource::Solid(0).encode()),
            pending: AtomicU16::new(PENDING_NONE),
            frame_cb: Mutex::new(None),
        }
    }

    /// The source rows are currently drawn from.
    pub fn active_source(&self) -> LineSource {
        LineSource::decode(self.active.load(Ordering::Acquire))
    }

    /// Request a source switch, applied at the next strobe boundary.
    pub fn request_source(&self, source: LineSource) {
        self.pending.store(source.encode(), Ordering::Release);
    }

    /// Apply a pending switch. Only safe at a strobe boundary: loop end,
    /// or immediately before arming a frame.
    pub fn apply_pending(&self) {
        let pending = self.pending.swap(PENDING_NONE, Ordering::AcqRel);
        if pending != PENDING_NONE {
            self.active.store(pending, Ordering::Release);
        }
    }

    /// Apply the pending source and start frame transmission.
    ///
    /// Called by whichever feeder wins the per-frame arm latch, and by the
    /// orchestrator for solid fills.
    pub(crate) fn arm_frame(&self, engine: &dyn TransferEngine) {
        self.apply_pending();
        engine.start_frame();
    }

    /// Refill one bounce-buffer row. Pull-context entry point.
    ///
    /// In queue mode, rows past the frame's row count (overscan pulls) are
    /// zero-filled without advancing. A pull that reaches an unclaimed row
    /// or an empty queue means production lost the real-time race; that is
    /// a broken contract, not a recoverable state, so it panics.
    pub fn fill_line(&self, buf: &mut [u8]) {
        match self.active_source() {
            LineSource::Solid(byte) => buf.fill(byte),
            LineSource::Queues => {
                let row = self.ctx.lines_consumed.load(Ordering::Relaxed);
                if row >= self.frame_lines {
                    buf.fill(0);
                    return;
                }
                let worker = match self.ctx.producer_of(row) {
                    Some(worker) => worker,
                    None => panic!("row {row} pulled before it was claimed"),
                };
                if self.ctx.queue(worker).pull(buf).is_err() {
                    panic!("row queue underrun at row {row}");
                }
                // Padding rows below the visible area carry no drive.
                if row >= self.visible_lines {
                    buf.fill(0);
                }
                self.ctx.lines_consumed.store(row + 1, Ordering::Release);
            }
        }
    }

    /// Pulse-generator loop completed: apply the pending source switch,
    /// run the registered frame hook, signal the orchestrator.
    pub fn on_loop_end(&self) {
        self.apply_pending();
        if let Some(cb) = self.frame_cb.lock().expect("frame callback poisoned").as_ref() {
            cb();
        }
        self.ctx.frame_done.release();
    }

    /// True when the next `fill_line` can complete without waiting.
    ///
    /// Simulated engines pace on this; real hardware gets the same
    /// guarantee from the electrical read-ahead margin.
    pub fn rows_ready(&self) -> bool {
        match self.active_source() {
            LineSource::Solid(_) => true,
            LineSource::Queues => {
                let row = self.ctx.lines_consumed.load(Ordering::Relaxed);
                if row >= self.frame_lines {
                    return true;
                }
                match self.ctx.producer_of(row) {
                    Some(worker) => !self.ctx.queue(worker).is_empty(),
                    None => false,
                }
            }
        }
    }

    /// Install the per-loop-end hook.
    pub fn register_frame_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.frame_cb.lock().expect("frame callback poisoned") = Some(Box::new(callback));
    }

    /// Remove the per-loop-end hook.
    pub fn clear_frame_callback(&self) {
        *self.frame_cb.lock().expect("frame callback poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelGeometry;
    use std::sync::atomic::AtomicUsize;

    fn fixture() -> (Arc<RenderContext>, DisplayBridge) {
        let ctx = Arc::new(RenderContext::new(PanelGeometry::new(16, 6).unwrap(), 1));
        let bridge = DisplayBridge::new(Arc::clone(&ctx));
        (ctx, bridge)
    }

    #[test]
    fn test_solid_source_memsets() {
        let (_ctx, bridge) = fixture();
        bridge.request_source(LineSource::Solid(0xAA));
        bridge.apply_pending();

        let mut buf = [0u8; 4];
        bridge.fill_line(&mut buf);
        assert_eq!(buf, [0xAA; 4]);
    }

    #[test]
    fn test_pending_switch_waits_for_loop_end() {
        let (_ctx, bridge) = fixture();
        bridge.request_source(LineSource::Solid(0x55));
        assert_eq!(bridge.active_source(), LineSource::Solid(0));

        bridge.on_loop_end();
        assert_eq!(bridge.active_source(), LineSource::Solid(0x55));
    }

    #[test]
    fn test_queue_mode_pulls_rows_in_order() {
        let (ctx, bridge) = fixture();
        // Frame rows land in worker 0's queue (frame_lines = 8 for a
        // 6-row panel: two padding rows).
        {
            let mut producer = ctx.queue(0).producer();
            for row in 0..8usize {
                ctx.record_producer(row, 0);
                let slot = producer.claim().unwrap();
                slot.fill(if row < 6 { row as u8 + 1 } else { 0x77 });
                producer.commit();
            }
        }
        bridge.request_source(LineSource::Queues);
        bridge.apply_pending();

        let mut buf = [0u8; 4];
        for row in 0..6usize {
            bridge.fill_line(&mut buf);
            assert_eq!(buf, [row as u8 + 1; 4]);
        }
        // Padding rows are forced to no-drive even if the queue said
        // otherwise.
        for _ in 6..8 {
            bridge.fill_line(&mut buf);
            assert_eq!(buf, [0; 4]);
        }
        assert_eq!(ctx.lines_consumed(), 8);

        // Overscan pulls past the frame zero-fill without advancing.
        bridge.fill_line(&mut buf);
        assert_eq!(buf, [0; 4]);
        assert_eq!(ctx.lines_consumed(), 8);
    }

    #[test]
    #[should_panic(expected = "underrun")]
    fn test_empty_queue_pull_is_fatal() {
        let (ctx, bridge) = fixture();
        ctx.record_producer(0, 0);
        bridge.request_source(LineSource::Queues);
        bridge.apply_pending();

        let mut buf = [0u8; 4];
        bridge.fill_line(&mut buf);
    }

    #[test]
    #[should_panic(expected = "before it was claimed")]
    fn test_unclaimed_row_pull_is_fatal() {
        let (_ctx, bridge) = fixture();
        bridge.request_source(LineSource::Queues);
        bridge.apply_pending();

        let mut buf = [0u8; 4];
        bridge.fill_line(&mut buf);
    }

    #[test]
    fn test_rows_ready_tracks_production() {
        let (ctx, bridge) = fixture();
        bridge.request_source(LineSource::Queues);
        bridge.apply_pending();
        assert!(!bridge.rows_ready(), "row 0 not claimed yet");

        ctx.record_producer(0, 0);
        assert!(!bridge.rows_ready(), "claimed but not committed");

        let mut producer = ctx.queue(0).producer();
        producer.claim().unwrap();
        producer.commit();
        assert!(bridge.rows_ready());
    }

    #[test]
    fn test_loop_end_runs_callback_and_signals_frame() {
        let (ctx, bridge) = fixture();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let hits = Arc::clone(&hits);
            bridge.register_frame_callback(move || {
                hits.fetch_add(1, Ordering::Relaxed);
            });
        }

        bridge.on_loop_end();
        bridge.on_loop_end();
        assert_eq!(hits.load(Ordering::Relaxed), 2);
        ctx.frame_done.acquire();
        ctx.frame_done.acquire();
        assert!(!ctx.frame_done.try_acquire());

        bridge.clear_frame_callback();
        bridge.on_loop_end();
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }
}
