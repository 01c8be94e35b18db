//! Real-time frame delivery for electrophoretic panels
//!
//! An e-paper update is a sequence of electrical frames: each frame sweeps
//! the panel top to bottom, strobing every row with 2-bit drive values
//! derived from the pixels and the current waveform phase. The hardware
//! that paces this — a pixel-clocked transfer peripheral plus a
//! free-running pulse generator — pulls rows in real time and must never
//! be kept waiting.
//!
//! This crate is the pipeline between a caller's bitmap and that hardware:
//!
//! - [`LineQueue`]: per-worker SPSC ring decoupling row conversion from
//!   the real-time pull.
//! - [`convert_line`]/[`mask_line`]: pure pixel-to-drive-bit packing.
//! - feeder workers racing over an atomic row cursor (internal, spawned
//!   per update cycle).
//! - [`RenderPipeline`]: the per-frame state machine, LUT rebuild and
//!   worker release.
//! - [`DisplayBridge`]: the interrupt-equivalent hand-off the transfer
//!   engine calls into.
//!
//! The peripheral itself stays behind [`TransferEngine`], and the
//! waveform-table science behind [`epd_waveform::LutBuilder`]; both are
//! supplied by the integrating layer.

mod bridge;
mod context;
mod convert;
mod cycle;
mod engine;
mod feeder;
mod line_queue;
mod panel;
mod plan;
mod sync;

pub use bridge::{DisplayBridge, LineSource};
pub use context::RenderContext;
pub use convert::{convert_line, mask_line};
pub use cycle::RenderPipeline;
pub use engine::TransferEngine;
pub use line_queue::{LineProducer, LineQueue, QueueEmpty};
pub use panel::{
    PanelGeometry, CLEAR_BYTE, DARK_BYTE, DEFAULT_FRAME_TIME_US, LINE_QUEUE_LEN,
    MONOCHROME_FRAME_TIME_US, NOOP_BYTE, OVERSCAN_LINES, PIXELS_PER_OUT_BYTE, READ_AHEAD_LINES,
};
pub use plan::{UpdatePlan, UpdateRequest};
pub use sync::Semaphore;
