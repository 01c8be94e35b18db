//! Draw-mode flags and pixel packing
//!
//! A [`DrawMode`] combines exactly one pixel [`Packing`] with optional
//! waveform-handling hints. The packing decides how many application pixels
//! fit one source byte and which converter and conversion-table shape the
//! pipeline uses.

use core::ops::{BitOr, BitOrAssign};

use crate::error::DrawError;

/// Flag set selecting pixel packing and waveform handling for one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawMode(u32);

impl DrawMode {
    /// One byte per pixel, encoding a `(from << 4) | to` intensity pair.
    pub const PACKING_1PPB_DIFFERENCE: DrawMode = DrawMode(1 << 0);

    /// Two pixels per byte, one 4-bit intensity nibble each.
    pub const PACKING_2PPB: DrawMode = DrawMode(1 << 1);

    /// Eight pixels per byte, one bit each (monochrome bitmaps).
    pub const PACKING_8PPB: DrawMode = DrawMode(1 << 2);

    /// Treat the update as strict black/white: fixed frame time, no
    /// grayscale voltage staging.
    pub const MONOCHROME: DrawMode = DrawMode(1 << 3);

    /// The updated region is known to currently display white.
    pub const PREVIOUSLY_WHITE: DrawMode = DrawMode(1 << 4);

    /// The updated region is known to currently display black.
    pub const PREVIOUSLY_BLACK: DrawMode = DrawMode(1 << 5);

    /// Raw flag bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every flag in `other` is also set in `self`.
    pub const fn contains(self, other: DrawMode) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when [`DrawMode::MONOCHROME`] is set.
    pub const fn is_monochrome(self) -> bool {
        self.contains(Self::MONOCHROME)
    }

    /// The pixel packing this mode selects.
    ///
    /// Exactly one packing flag must be set, otherwise
    /// [`DrawError::INVALID_PACKING_MODE`] is returned.
    pub fn packing(self) -> Result<Packing, DrawError> {
        let selected = [
            (Self::PACKING_1PPB_DIFFERENCE, Packing::Difference1PpB),
            (Self::PACKING_2PPB, Packing::Gray2PpB),
            (Self::PACKING_8PPB, Packing::Mono8PpB),
        ];
        let mut found = None;
        for (flag, packing) in selected {
            if self.contains(flag) {
                if found.is_some() {
                    return Err(DrawError::INVALID_PACKING_MODE);
                }
                found = Some(packing);
            }
        }
        found.ok_or(DrawError::INVALID_PACKING_MODE)
    }
}

impl BitOr for DrawMode {
    type Output = DrawMode;

    fn bitor(self, rhs: DrawMode) -> DrawMode {
        DrawMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for DrawMode {
    fn bitor_assign(&mut self, rhs: DrawMode) {
        self.0 |= rhs.0;
    }
}

/// Pixel packing of the application framebuffer handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Packing {
    /// One byte per pixel: `(from << 4) | to` intensity transition.
    Difference1PpB,
    /// Two 4-bit grayscale pixels per byte.
    Gray2PpB,
    /// Eight 1-bit pixels per byte.
    Mono8PpB,
}

impl Packing {
    /// Application pixels stored in one source byte.
    pub const fn pixels_per_byte(self) -> usize {
        match self {
            Packing::Difference1PpB => 1,
            Packing::Gray2PpB => 2,
            Packing::Mono8PpB => 8,
        }
    }

    /// Source bytes holding one row of `width` pixels.
    pub const fn bytes_per_line(self, width: usize) -> usize {
        width.div_ceil(self.pixels_per_byte())
    }

    /// Length of the conversion table this packing's converter consumes.
    ///
    /// - difference packing: one entry per `(from, to)` byte (256)
    /// - grayscale packing: one entry per two-pixel byte (256)
    /// - monochrome packing: one output byte per input nibble (16)
    pub const fn lut_len(self) -> usize {
        match self {
            Packing::Difference1PpB => 256,
            Packing::Gray2PpB => 256,
            Packing::Mono8PpB => 16,
        }
    }
}
