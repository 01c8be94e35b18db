//! Update requests and the validated per-cycle plan
//!
//! All geometry checking happens here, before any frame is armed: an
//! update that cannot be delivered must be rejected up front, because once
//! the pulse generator runs every frame has to complete to keep the panel
//! drive voltages consistent.

use epd_waveform::{DrawError, DrawMode, Packing, Rect, WaveformPhase};

use crate::convert::{convert_line, mask_line};
use crate::panel::{
    PanelGeometry, DEFAULT_FRAME_TIME_US, MONOCHROME_FRAME_TIME_US, PIXELS_PER_OUT_BYTE,
};

/// One bitmap update as handed in by the caller.
///
/// `data` holds `area.height` rows of packed pixels, `area.width / ppb`
/// bytes each (rounded up). `crop` optionally restricts the driven region
/// to a sub-rectangle, in absolute panel coordinates. `drawn_rows`, when
/// present, carries one flag per row of `area`; rows with a cleared flag
/// are known unchanged and are driven as no-ops without conversion.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRequest<'a> {
    /// Packed pixel rows, layout per `mode`'s packing.
    pub data: &'a [u8],
    /// Placement of `data` on the panel.
    pub area: Rect,
    /// Optional sub-rectangle actually driven, absolute panel coordinates.
    pub crop: Option<Rect>,
    /// Packing and waveform-handling flags.
    pub mode: DrawMode,
    /// Phase descriptors, one per frame of the cycle.
    pub phases: &'a [WaveformPhase],
    /// Per-row change mask over `area`, row 0 = top of `area`.
    pub drawn_rows: Option<&'a [bool]>,
}

/// A validated update, with the driven region resolved against the panel.
///
/// Row and column ranges are in panel coordinates; `first_row..last_row`
/// and `start_x..end_x` are the intersection of `area`, `crop` and the
/// visible panel, and may be empty (every row becomes a no-op).
#[derive(Debug, Clone, Copy)]
pub struct UpdatePlan<'a> {
    /// Flags as requested, passed through to the table builder.
    pub mode: DrawMode,
    /// Packing derived from `mode`.
    pub packing: Packing,
    /// Phase sequence for the cycle; one frame per entry.
    pub phases: &'a [WaveformPhase],
    data: &'a [u8],
    drawn_rows: Option<&'a [bool]>,
    area: Rect,
    /// First driven panel row.
    pub first_row: usize,
    /// One past the last driven panel row.
    pub last_row: usize,
    /// First driven pixel column; aligned to the packing.
    pub start_x: usize,
    /// One past the last driven pixel column.
    pub end_x: usize,
    data_line_bytes: usize,
}

impl<'a> UpdatePlan<'a> {
    /// Validate `request` against `geometry`.
    ///
    /// Fails with [`DrawError::INVALID_PACKING_MODE`] when the mode does
    /// not name exactly one packing, [`DrawError::MISSING_PHASE`] when the
    /// phase sequence is empty, and [`DrawError::BAD_GEOMETRY`] for
    /// misaligned horizontal placement or a `data` buffer shorter than
    /// `area` requires.
    pub fn new(geometry: PanelGeometry, request: &UpdateRequest<'a>) -> Result<Self, DrawError> {
        let packing = request.mode.packing()?;
        if request.phases.is_empty() {
            return Err(DrawError::MISSING_PHASE);
        }

        // Horizontal placement must land on both an input byte and an
        // output byte boundary, so converted bytes never straddle two
        // source bytes.
        let align = packing.pixels_per_byte().max(PIXELS_PER_OUT_BYTE) as i32;
        if request.area.x % align != 0 {
            return Err(DrawError::BAD_GEOMETRY);
        }
        if let Some(crop) = request.crop {
            if crop.x % align != 0 {
                return Err(DrawError::BAD_GEOMETRY);
            }
        }

        let data_line_bytes = (request.area.width as usize).div_ceil(packing.pixels_per_byte());
        let area_rows = request.area.height as usize;
        if request.data.len() < area_rows * data_line_bytes {
            return Err(DrawError::BAD_GEOMETRY);
        }
        if let Some(drawn) = request.drawn_rows {
            if drawn.len() < area_rows {
                return Err(DrawError::BAD_GEOMETRY);
            }
        }

        let mut first_row = request.area.y.max(0);
        let mut last_row = request.area.bottom().min(geometry.height as i32);
        let mut start_x = request.area.x.max(0);
        let mut end_x = request.area.right().min(geometry.width as i32);
        if let Some(crop) = request.crop {
            first_row = first_row.max(crop.y);
            last_row = last_row.min(crop.bottom());
            start_x = start_x.max(crop.x);
            end_x = end_x.min(crop.right());
        }
        // An empty intersection is a legal no-op update.
        if last_row < first_row {
            last_row = first_row;
        }
        if end_x < start_x {
            end_x = start_x;
        }

        Ok(UpdatePlan {
            mode: request.mode,
            packing,
            phases: request.phases,
            data: request.data,
            drawn_rows: request.drawn_rows,
            area: request.area,
            first_row: first_row as usize,
            last_row: last_row as usize,
            start_x: start_x as usize,
            end_x: end_x as usize,
            data_line_bytes,
        })
    }

    /// Frames in this cycle, one per phase descriptor.
    pub fn frame_count(&self) -> usize {
        self.phases.len()
    }

    /// Row strobe duration for `frame`.
    ///
    /// Monochrome waveforms run at a fixed time; otherwise the phase's
    /// own time applies, with a default when the descriptor carries none.
    pub fn frame_time_us(&self, frame: usize) -> u32 {
        if self.mode.is_monochrome() {
            return MONOCHROME_FRAME_TIME_US;
        }
        match self.phases.get(frame) {
            Some(phase) if phase.time_us != 0 => phase.time_us,
            _ => DEFAULT_FRAME_TIME_US,
        }
    }

    /// The packed input bytes backing panel row `row`, or `None` when the
    /// row is outside the driven region or masked off by `drawn_rows`.
    fn input_row(&self, row: usize) -> Option<&'a [u8]> {
        if row < self.first_row || row >= self.last_row {
            return None;
        }
        let area_row = (row as i32 - self.area.y) as usize;
        if let Some(drawn) = self.drawn_rows {
            if !drawn[area_row] {
                return None;
            }
        }
        let start = area_row * self.data_line_bytes;
        Some(&self.data[start..start + self.data_line_bytes])
    }

    /// Produce the transfer bytes for panel row `row` into `out` (one full
    /// panel row). Rows outside the plan are zero-filled; partial-width
    /// coverage converts only the covered byte range and masks the
    /// boundary pixels.
    pub fn convert_row(&self, row: usize, lut: &[u8], out: &mut [u8]) -> DrawError {
        let Some(input) = self.input_row(row) else {
            out.fill(0);
            return DrawError::NONE;
        };
        let covered_px = self.end_x - self.start_x;
        if covered_px == 0 {
            out.fill(0);
            return DrawError::NONE;
        }

        out.fill(0);
        let ppb = self.packing.pixels_per_byte();
        let in_offset = (self.start_x as i32 - self.area.x) as usize / ppb;
        let in_bytes = covered_px.div_ceil(ppb).min(self.data_line_bytes - in_offset);
        let out_offset = self.start_x / PIXELS_PER_OUT_BYTE;
        let out_bytes = covered_px.div_ceil(PIXELS_PER_OUT_BYTE);

        let err = convert_line(
            self.packing,
            &input[in_offset..in_offset + in_bytes],
            lut,
            &mut out[out_offset..out_offset + out_bytes],
        );
        mask_line(out, self.start_x, self.end_x);
        err
    }
}
