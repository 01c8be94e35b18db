//! Simulated transfer engine for the frame delivery pipeline
//!
//! Stands in for the pixel-clocked peripheral and its pulse generator: a
//! pump thread pulls rows from the [`DisplayBridge`] at the programmed
//! loop count and captures every transferred frame for inspection. The
//! pump paces itself on [`DisplayBridge::rows_ready`], which models the
//! electrical fact that the pixel clock never outruns row production on
//! real hardware — the host scheduler gives no such guarantee.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::trace;

use epd_render::{DisplayBridge, PanelGeometry, Semaphore, TransferEngine};

/// One electrical frame as the panel would have seen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Row strobe duration programmed for this frame.
    pub frame_time_us: u32,
    /// Every row pulled during the loop, overscan rows included.
    pub rows: Vec<Vec<u8>>,
}

impl CapturedFrame {
    /// The rows that land on the visible panel area.
    pub fn visible_rows(&self, height: usize) -> &[Vec<u8>] {
        &self.rows[..height]
    }

    /// True when every pulled row consists solely of `byte`.
    pub fn is_solid(&self, byte: u8) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|&b| b == byte))
    }
}

struct PumpShared {
    bridge: Arc<DisplayBridge>,
    geometry: PanelGeometry,
    start: Semaphore,
    shutdown: AtomicBool,
    frame_time: AtomicU32,
    frames_completed: AtomicUsize,
    captured: Mutex<Vec<CapturedFrame>>,
}

impl PumpShared {
    fn pump(&self) {
        loop {
            self.start.acquire();
            if self.shutdown.load(Ordering::Acquire) {
                return;
            }
            let mut rows = Vec::with_capacity(self.geometry.pulse_loop_count());
            let mut buf = vec![0u8; self.geometry.line_bytes()];
            for _ in 0..self.geometry.pulse_loop_count() {
                // Hardware pacing stand-in: wait for the row to exist.
                while !self.bridge.rows_ready() {
                    thread::yield_now();
                }
                self.bridge.fill_line(&mut buf);
                rows.push(buf.clone());
            }
            self.captured.lock().expect("capture poisoned").push(CapturedFrame {
                frame_time_us: self.frame_time.load(Ordering::Relaxed),
                rows,
            });
            let done = self.frames_completed.fetch_add(1, Ordering::Relaxed) + 1;
            trace!(frame = done, "simulated frame transferred");
            self.bridge.on_loop_end();
        }
    }
}

/// Transfer engine backed by a pump thread instead of hardware.
pub struct SimTransferEngine {
    shared: Arc<PumpShared>,
    stops: AtomicUsize,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SimTransferEngine {
    /// Spawn the pump thread for `geometry`, pulling through `bridge`.
    pub fn new(bridge: Arc<DisplayBridge>, geometry: PanelGeometry) -> Self {
        let shared = Arc::new(PumpShared {
            bridge,
            geometry,
            start: Semaphore::new(0),
            shutdown: AtomicBool::new(false),
            frame_time: AtomicU32::new(0),
            frames_completed: AtomicUsize::new(0),
            captured: Mutex::new(Vec::new()),
        });
        let pump = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("epd-sim-pump".into())
                .spawn(move || shared.pump())
                .expect("spawn pump thread")
        };
        SimTransferEngine {
            shared,
            stops: AtomicUsize::new(0),
            pump: Mutex::new(Some(pump)),
        }
    }

    /// Frames fully transferred so far.
    pub fn frames_completed(&self) -> usize {
        self.shared.frames_completed.load(Ordering::Relaxed)
    }

    /// Times `stop` has been called.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::Relaxed)
    }

    /// Drain all captured frames, oldest first.
    pub fn take_frames(&self) -> Vec<CapturedFrame> {
        std::mem::take(&mut *self.shared.captured.lock().expect("capture poisoned"))
    }

    /// The most recently captured frame, if any.
    pub fn last_frame(&self) -> Option<CapturedFrame> {
        self.shared
            .captured
            .lock()
            .expect("capture poisoned")
            .last()
            .cloned()
    }
}

impl TransferEngine for SimTransferEngine {
    fn set_frame_time(&self, us: u32) {
        self.shared.frame_time.store(us, Ordering::Relaxed);
    }

    fn start_frame(&self) {
        self.shared.start.release();
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for SimTransferEngine {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.start.release();
        if let Some(pump) = self.pump.lock().expect("pump handle poisoned").take() {
            let _ = pump.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epd_render::{LineSource, RenderContext};
    use std::sync::mpsc;

    #[test]
    fn test_captured_frame_helpers() {
        let frame = CapturedFrame {
            frame_time_us: 120,
            rows: vec![vec![0x55; 4]; 13],
        };
        assert!(frame.is_solid(0x55));
        assert!(!frame.is_solid(0xAA));
        assert_eq!(frame.visible_rows(8).len(), 8);
    }

    #[test]
    fn test_pump_transfers_one_solid_frame() {
        let geometry = PanelGeometry::new(16, 8).unwrap();
        let ctx = Arc::new(RenderContext::new(geometry, 1));
        let bridge = Arc::new(DisplayBridge::new(ctx));
        let engine = SimTransferEngine::new(Arc::clone(&bridge), geometry);

        let (tx, rx) = mpsc::channel();
        bridge.register_frame_callback(move || {
            tx.send(()).expect("frame signal");
        });

        bridge.request_source(LineSource::Solid(0x55));
        bridge.apply_pending();
        engine.set_frame_time(42);
        engine.start_frame();
        rx.recv().expect("frame completed");

        assert_eq!(engine.frames_completed(), 1);
        let frame = engine.last_frame().unwrap();
        assert_eq!(frame.frame_time_us, 42);
        assert_eq!(frame.rows.len(), geometry.pulse_loop_count());
        assert!(frame.is_solid(0x55));
    }

    #[test]
    fn test_drop_stops_the_pump_thread() {
        let geometry = PanelGeometry::new(16, 8).unwrap();
        let ctx = Arc::new(RenderContext::new(geometry, 1));
        let bridge = Arc::new(DisplayBridge::new(ctx));
        let engine = SimTransferEngine::new(bridge, geometry);
        drop(engine);
    }
}
