//! Transfer engine contract
//!
//! The pixel-clocked peripheral and its pulse generator are external
//! hardware; the pipeline only needs this narrow lifecycle. An engine
//! implementation is expected to, once a frame is started, call
//! [`DisplayBridge::fill_line`](crate::DisplayBridge::fill_line) for
//! `frame_lines + OVERSCAN_LINES` rows and then
//! [`DisplayBridge::on_loop_end`](crate::DisplayBridge::on_loop_end) —
//! the loop count and the pull cadence must stay numerically consistent
//! or the panel tears.

/// Hardware lifecycle as seen by the pipeline.
pub trait TransferEngine: Send + Sync {
    /// Program the row strobe duration for the upcoming frame.
    fn set_frame_time(&self, us: u32);

    /// Arm one frame: run the pulse generator for the full loop count,
    /// pulling rows as the bounce buffer drains. Must not block the
    /// caller for the duration of the frame.
    fn start_frame(&self);

    /// Stop transfers at the end of an update. Idempotent.
    fn stop(&self);
}
