//! Panel geometry and electrical timing constants
//!
//! The LCD peripheral transfers whole rows of 2-bit drive values (4 pixels
//! per byte), and its vertical resolution must be a multiple of 4, so a
//! frame may carry a few padding rows below the visible area. The pulse
//! generator's loop count additionally includes a fixed overscan so the
//! row strobe settles before the next frame.

use epd_waveform::{DrawError, Rect};

/// Strobe loops appended past the last transferred row.
///
/// Must stay consistent with the pull cadence: loop count =
/// `frame_lines() + OVERSCAN_LINES`, or the panel image tears.
pub const OVERSCAN_LINES: usize = 5;

/// Rows that must be queued before frame transmission is armed — twice the
/// peripheral's internal bounce-buffer depth, so production jitter cannot
/// starve the pull side right after start.
pub const READ_AHEAD_LINES: usize = 32;

/// Row queue capacity per feeder worker, in rows.
pub const LINE_QUEUE_LEN: usize = 32;

/// Row strobe duration when the phase descriptor carries none.
pub const DEFAULT_FRAME_TIME_US: u32 = 120;

/// Fixed row strobe duration for strict black/white updates.
pub const MONOCHROME_FRAME_TIME_US: u32 = 240;

/// Drive byte moving all four pixels towards white.
pub const CLEAR_BYTE: u8 = 0xAA;

/// Drive byte moving all four pixels towards black.
pub const DARK_BYTE: u8 = 0x55;

/// Drive byte leaving all four pixels untouched.
pub const NOOP_BYTE: u8 = 0x00;

/// Output pixels packed into one transfer byte (2 drive bits each).
pub const PIXELS_PER_OUT_BYTE: usize = 4;

/// Visible panel dimensions plus the derived hardware transfer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelGeometry {
    /// Visible width in pixels.
    pub width: usize,
    /// Visible height in rows.
    pub height: usize,
}

impl PanelGeometry {
    /// Geometry for a `width × height` panel.
    ///
    /// The width must be a multiple of 4 so rows pack into whole transfer
    /// bytes.
    pub fn new(width: usize, height: usize) -> Result<Self, DrawError> {
        if width == 0 || height == 0 || width % PIXELS_PER_OUT_BYTE != 0 {
            return Err(DrawError::BAD_GEOMETRY);
        }
        Ok(PanelGeometry { width, height })
    }

    /// Transfer bytes per row (4 pixels per byte).
    pub const fn line_bytes(&self) -> usize {
        self.width / PIXELS_PER_OUT_BYTE
    }

    /// Rows transferred per frame: visible height padded up to a multiple
    /// of 4 as the peripheral requires.
    pub const fn frame_lines(&self) -> usize {
        self.height.div_ceil(4) * 4
    }

    /// Pulse generator loop count for one frame.
    pub const fn pulse_loop_count(&self) -> usize {
        self.frame_lines() + OVERSCAN_LINES
    }

    /// The full visible area as a rectangle.
    pub const fn full_area(&self) -> Rect {
        Rect::full(self.width as u32, self.height as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_bytes() {
        let g = PanelGeometry::new(960, 540).unwrap();
        assert_eq!(g.line_bytes(), 240);
    }

    #[test]
    fn test_frame_lines_padding() {
        let g = PanelGeometry::new(960, 540).unwrap();
        assert_eq!(g.frame_lines(), 540);

        let g = PanelGeometry::new(16, 10).unwrap();
        assert_eq!(g.frame_lines(), 12);
    }

    #[test]
    fn test_pulse_loop_count_tracks_frame_lines() {
        let g = PanelGeometry::new(16, 10).unwrap();
        assert_eq!(g.pulse_loop_count(), g.frame_lines() + OVERSCAN_LINES);
    }

    #[test]
    fn test_rejects_unpackable_width() {
        assert!(PanelGeometry::new(10, 10).is_err());
        assert!(PanelGeometry::new(0, 10).is_err());
        assert!(PanelGeometry::new(16, 0).is_err());
    }
}
