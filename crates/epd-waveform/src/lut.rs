//! Conversion-table builder contract
//!
//! The frame orchestrator rebuilds the pixel→drive conversion table once per
//! frame. The table *contents* — which voltage sequence moves which particle
//! population — are vendor/panel specific and live behind this trait.

use crate::error::DrawError;
use crate::mode::DrawMode;
use crate::waveform::WaveformPhase;

/// Builds the per-frame conversion table for the row converters.
///
/// Called once per frame from the orchestrator, never from the real-time
/// pull path. `lut` is sized by the pipeline according to the mode's
/// packing (see [`Packing::lut_len`](crate::mode::Packing::lut_len)); a
/// builder that cannot serve that shape reports
/// [`DrawError::LUT_UNAVAILABLE`] and the frame is driven as a no-op.
///
/// Errors are returned as flags, not `Result`: the cycle keeps running and
/// accumulates them (see [`DrawError`]).
pub trait LutBuilder: Send + Sync {
    /// Fill `lut` for frame `frame` of the sequence described by `phase`.
    fn build_conversion_table(
        &self,
        mode: DrawMode,
        frame: usize,
        phase: &WaveformPhase,
        lut: &mut [u8],
    ) -> DrawError;
}

/// Builder that fills every entry with one constant drive byte.
///
/// Useful for clear cycles and tests; real grayscale updates need a
/// vendor-supplied builder.
#[derive(Debug, Clone, Copy)]
pub struct ConstLutBuilder {
    /// Value written to every table entry.
    pub value: u8,
}

impl LutBuilder for ConstLutBuilder {
    fn build_conversion_table(
        &self,
        _mode: DrawMode,
        _frame: usize,
        _phase: &WaveformPhase,
        lut: &mut [u8],
    ) -> DrawError {
        lut.fill(self.value);
        DrawError::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_builder_fills_table() {
        let builder = ConstLutBuilder { value: 0xAA };
        let mut lut = [0u8; 16];
        let err = builder.build_conversion_table(
            DrawMode::PACKING_8PPB,
            0,
            &WaveformPhase::new(120),
            &mut lut,
        );
        assert!(err.is_ok());
        assert!(lut.iter().all(|&b| b == 0xAA));
    }
}
