//! Feeder workers: claim rows, convert them, keep the queues full
//!
//! One feeder runs per configured worker for the duration of an update
//! cycle. Between frames it parks on its release semaphore; within a frame
//! it races the other workers over the shared claim cursor, so row
//! production interleaves freely while consumption stays strictly ordered
//! by row index.

use epd_waveform::DrawError;

use crate::bridge::{DisplayBridge, LineSource};
use crate::context::RenderContext;
use crate::engine::TransferEngine;
use crate::panel::READ_AHEAD_LINES;
use crate::plan::UpdatePlan;

/// Row index at whose commit frame transmission is armed.
///
/// Counted from row 0 so that frames shorter than the read-ahead margin
/// still arm (the last row then carries the arm duty).
pub(crate) fn arm_line(frame_lines: usize) -> usize {
    READ_AHEAD_LINES.min(frame_lines) - 1
}

/// Body of one feeder worker; runs `plan.frame_count()` frames and
/// returns.
///
/// Per frame: wait for release, claim rows off the shared cursor until
/// the frame is exhausted, convert each into the own queue, and arm
/// transmission once the read-ahead threshold row is committed. The
/// worker that claims that row wins the arm latch; the hand-off happens
/// exactly once per frame.
pub(crate) fn run_feeder(
    ctx: &RenderContext,
    bridge: &DisplayBridge,
    engine: &dyn TransferEngine,
    plan: &UpdatePlan<'_>,
    worker: usize,
) {
    let frame_lines = ctx.geometry().frame_lines();
    let arm_line = arm_line(frame_lines);
    let mut producer = ctx.queue(worker).producer();

    for _ in 0..plan.frame_count() {
        ctx.frame_start[worker].acquire();
        let lut = ctx
            .conversion_lut
            .read()
            .expect("conversion table poisoned");
        let mut errors = DrawError::NONE;

        loop {
            let row = ctx.claim_line();
            if row >= frame_lines {
                break;
            }
            ctx.record_producer(row, worker as u8);

            // Backpressure: waits for the pull side once the own ring is
            // full, which can only happen after arming (ring capacity >=
            // read-ahead margin).
            let slot = producer.claim_spin();
            errors |= plan.convert_row(row, &lut, slot);
            producer.commit();

            if row == arm_line && ctx.try_arm() {
                bridge.request_source(LineSource::Queues);
                bridge.arm_frame(engine);
            }
        }

        drop(lut);
        ctx.record_error(errors);
        ctx.feed_done.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_line_is_read_ahead_for_tall_frames() {
        assert_eq!(arm_line(540), READ_AHEAD_LINES - 1);
    }

    #[test]
    fn test_arm_line_clamps_to_short_frames() {
        assert_eq!(arm_line(12), 11);
        assert_eq!(arm_line(READ_AHEAD_LINES), READ_AHEAD_LINES - 1);
    }
}
