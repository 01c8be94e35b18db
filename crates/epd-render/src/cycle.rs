//! Frame orchestration: the per-update state machine
//!
//! [`RenderPipeline::push_frame_cycle`] runs Idle → FrameStart → Running →
//! FrameDone synchronously for every phase of the update. Each frame:
//! rebuild the conversion table, program the strobe time, reset the
//! frame-scoped counters, release the feeders, then wait for the pulse
//! generator's loop-end signal plus every worker's completion signal.
//! Recoverable errors accumulate across the cycle; every frame is still
//! delivered, because stopping mid-cycle would leave the panel's drive
//! voltages out of sequence.

use std::sync::Arc;
use std::thread;

use tracing::{debug, trace, warn};

use epd_waveform::{DrawError, LutBuilder};

use crate::bridge::{DisplayBridge, LineSource};
use crate::context::RenderContext;
use crate::engine::TransferEngine;
use crate::feeder::run_feeder;
use crate::panel::{PanelGeometry, NOOP_BYTE};
use crate::plan::{UpdatePlan, UpdateRequest};

/// Cooperative yield cadence, so long cycles do not starve the rest of
/// the system.
const YIELD_INTERVAL_FRAMES: usize = 8;

/// The frame delivery pipeline: context, bridge, engine and the LUT
/// collaborator, wired together once at driver init.
pub struct RenderPipeline<E: TransferEngine> {
    ctx: Arc<RenderContext>,
    bridge: Arc<DisplayBridge>,
    engine: Arc<E>,
    lut_builder: Box<dyn LutBuilder>,
}

impl<E: TransferEngine> RenderPipeline<E> {
    /// Wire up a pipeline for `geometry` with `workers` feeder threads.
    ///
    /// The engine is built last, through `make_engine`, so it can hold the
    /// bridge it pulls rows from.
    pub fn new<B, F>(
        geometry: PanelGeometry,
        workers: usize,
        lut_builder: B,
        make_engine: F,
    ) -> Self
    where
        B: LutBuilder + 'static,
        F: FnOnce(Arc<DisplayBridge>) -> Arc<E>,
    {
        let ctx = Arc::new(RenderContext::new(geometry, workers));
        let bridge = Arc::new(DisplayBridge::new(Arc::clone(&ctx)));
        let engine = make_engine(Arc::clone(&bridge));
        RenderPipeline {
            ctx,
            bridge,
            engine,
            lut_builder: Box::new(lut_builder),
        }
    }

    /// The shared pipeline state, mostly useful for inspection in tests.
    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// The hardware-facing bridge.
    pub fn bridge(&self) -> &DisplayBridge {
        &self.bridge
    }

    /// The transfer engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Install a hook invoked at every pulse-generator loop end.
    pub fn register_frame_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.bridge.register_frame_callback(callback);
    }

    /// Remove the loop-end hook.
    pub fn clear_frame_callback(&self) {
        self.bridge.clear_frame_callback();
    }

    /// Run the full multi-frame update cycle synchronously.
    ///
    /// Geometry and mode problems are reported before anything is armed;
    /// once frames run, recoverable errors (table rebuild failures) are
    /// OR'd together and returned after the last frame. Check the result
    /// with [`DrawError::is_ok`].
    pub fn push_frame_cycle(&self, request: &UpdateRequest<'_>) -> DrawError {
        let plan = match UpdatePlan::new(self.ctx.geometry(), request) {
            Ok(plan) => plan,
            Err(err) => return err,
        };
        let cycle_frames = plan.frame_count();
        let lut_len = plan.packing.lut_len();
        debug!(
            frames = cycle_frames,
            rows = plan.last_row - plan.first_row,
            "starting frame cycle"
        );

        thread::scope(|scope| {
            let ctx = self.ctx.as_ref();
            let bridge = self.bridge.as_ref();
            let engine: &dyn TransferEngine = self.engine.as_ref();
            let plan_ref = &plan;
            for worker in 0..ctx.worker_count() {
                scope.spawn(move || run_feeder(ctx, bridge, engine, plan_ref, worker));
            }

            for frame in 0..cycle_frames {
                // FrameStart: table rebuild happens strictly before the
                // workers are released, so they read it without a lock
                // conflict.
                {
                    let mut lut = self
                        .ctx
                        .conversion_lut
                        .write()
                        .expect("conversion table poisoned");
                    lut.resize(lut_len, 0);
                    let err = self.lut_builder.build_conversion_table(
                        plan.mode,
                        frame,
                        &plan.phases[frame],
                        &mut lut,
                    );
                    self.ctx.record_error(err);
                }
                self.engine.set_frame_time(plan.frame_time_us(frame));
                self.ctx.begin_frame();
                trace!(frame, "frame start");
                for sem in &self.ctx.frame_start {
                    sem.release();
                }

                // Running: the pulse generator signals loop end, every
                // worker signals feed completion.
                self.ctx.frame_done.acquire();
                for _ in 0..self.ctx.worker_count() {
                    self.ctx.feed_done.acquire();
                }

                // FrameDone.
                if (frame + 1) % YIELD_INTERVAL_FRAMES == 0 {
                    thread::yield_now();
                }
            }
        });

        self.engine.stop();
        // Idle again: park the bridge on a no-drive source. No frame is
        // in flight, so the switch applies immediately.
        self.bridge.request_source(LineSource::Solid(NOOP_BYTE));
        self.bridge.apply_pending();

        let errors = self.ctx.take_errors();
        if errors.is_ok() {
            debug!(frames = cycle_frames, "frame cycle complete");
        } else {
            warn!(%errors, "frame cycle completed with errors");
        }
        errors
    }

    /// Drive one solid-fill frame, bypassing the feeders entirely.
    ///
    /// The bridge synthesizes every row as `fill`; returns after exactly
    /// one frame-completion signal.
    pub fn push_solid_color(&self, fill: u8, frame_time_us: u32) {
        trace!(fill, frame_time_us, "solid fill frame");
        self.engine.set_frame_time(frame_time_us);
        self.bridge.request_source(LineSource::Solid(fill));
        self.bridge.arm_frame(self.engine.as_ref());
        self.ctx.frame_done.acquire();
        self.engine.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{CLEAR_BYTE, OVERSCAN_LINES};
    use epd_waveform::{ConstLutBuilder, DrawMode, Rect, WaveformPhase};
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::{Mutex, OnceLock};

    /// Engine double that runs a whole frame inside `start_frame`. Only
    /// valid for solid fills, where no feeder has to make progress
    /// concurrently.
    struct SyncEngine {
        bridge: OnceLock<Arc<DisplayBridge>>,
        geometry: PanelGeometry,
        frame_time: AtomicU32,
        frames: AtomicUsize,
        stops: AtomicUsize,
        last_frame: Mutex<Vec<Vec<u8>>>,
    }

    impl SyncEngine {
        fn new(geometry: PanelGeometry) -> Self {
            SyncEngine {
                bridge: OnceLock::new(),
                geometry,
                frame_time: AtomicU32::new(0),
                frames: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                last_frame: Mutex::new(Vec::new()),
            }
        }
    }

    impl TransferEngine for SyncEngine {
        fn set_frame_time(&self, us: u32) {
            self.frame_time.store(us, Ordering::Relaxed);
        }

        fn start_frame(&self) {
            let bridge = self.bridge.get().expect("bridge wired");
            let mut rows = Vec::new();
            let mut buf = vec![0u8; self.geometry.line_bytes()];
            for _ in 0..self.geometry.pulse_loop_count() {
                bridge.fill_line(&mut buf);
                rows.push(buf.clone());
            }
            *self.last_frame.lock().unwrap() = rows;
            self.frames.fetch_add(1, Ordering::Relaxed);
            bridge.on_loop_end();
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn solid_pipeline() -> RenderPipeline<SyncEngine> {
        let geometry = PanelGeometry::new(16, 8).unwrap();
        RenderPipeline::new(geometry, 1, ConstLutBuilder { value: 0 }, |bridge| {
            let engine = Arc::new(SyncEngine::new(geometry));
            engine.bridge.set(bridge).ok().expect("set once");
            engine
        })
    }

    #[test]
    fn test_solid_fill_runs_exactly_one_frame() {
        let pipeline = solid_pipeline();
        pipeline.push_solid_color(CLEAR_BYTE, 50);

        let engine = pipeline.engine();
        assert_eq!(engine.frames.load(Ordering::Relaxed), 1);
        assert_eq!(engine.frame_time.load(Ordering::Relaxed), 50);
        assert_eq!(engine.stops.load(Ordering::Relaxed), 1);

        let rows = engine.last_frame.lock().unwrap();
        assert_eq!(rows.len(), 8 + OVERSCAN_LINES);
        assert!(rows.iter().all(|row| row.iter().all(|&b| b == CLEAR_BYTE)));
        // Solid mode never touches the row accounting.
        assert_eq!(pipeline.context().lines_consumed(), 0);
    }

    #[test]
    fn test_invalid_geometry_rejected_before_arming() {
        let pipeline = solid_pipeline();
        let phases = [WaveformPhase::new(100)];
        let data = [0u8; 8];
        let request = UpdateRequest {
            data: &data,
            area: Rect::new(2, 0, 4, 2), // misaligned x
            crop: None,
            mode: DrawMode::PACKING_1PPB_DIFFERENCE,
            phases: &phases,
            drawn_rows: None,
        };

        let err = pipeline.push_frame_cycle(&request);
        assert_eq!(err, DrawError::BAD_GEOMETRY);
        assert_eq!(pipeline.engine().frames.load(Ordering::Relaxed), 0);
        assert_eq!(pipeline.engine().stops.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_empty_phase_sequence_rejected() {
        let pipeline = solid_pipeline();
        let data = [0u8; 16 * 8];
        let request = UpdateRequest {
            data: &data,
            area: Rect::full(16, 8),
            crop: None,
            mode: DrawMode::PACKING_1PPB_DIFFERENCE,
            phases: &[],
            drawn_rows: None,
        };

        assert_eq!(
            pipeline.push_frame_cycle(&request),
            DrawError::MISSING_PHASE
        );
        assert_eq!(pipeline.engine().frames.load(Ordering::Relaxed), 0);
    }
}
