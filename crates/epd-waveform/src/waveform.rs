//! Waveform phase tables
//!
//! A waveform definition groups drive instructions by display mode, then by
//! temperature range, into an ordered sequence of [`WaveformPhase`]s — one
//! phase per frame of a multi-frame update. The voltage science behind the
//! tables lives with the vendor; this crate only carries the shape and the
//! per-frame timing the pipeline needs.
//!
//! Definitions are normally compiled into the firmware image, so all tables
//! borrow their storage from the caller for the duration of an update.

/// Drive-voltage instructions for one frame of an update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveformPhase {
    /// Frame duration in microseconds. `0` means "use the driver default".
    pub time_us: u32,
    /// Opaque payload index handed through to the conversion-table builder.
    pub payload: u16,
}

impl WaveformPhase {
    /// A phase lasting `time_us` microseconds.
    pub const fn new(time_us: u32) -> Self {
        WaveformPhase {
            time_us,
            payload: 0,
        }
    }
}

/// Phase sequence valid for one temperature range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RangeData<'a> {
    /// Inclusive lower temperature bound, in °C.
    pub temp_min: i8,
    /// Exclusive upper temperature bound, in °C.
    pub temp_max: i8,
    /// One phase per frame, in drive order.
    pub phases: &'a [WaveformPhase],
}

/// Phase tables for one display mode, across temperature ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModeData<'a> {
    /// Per-temperature-range phase sequences.
    pub ranges: &'a [RangeData<'a>],
}

/// A complete waveform definition for one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Waveform<'a> {
    /// Per-mode phase tables.
    pub modes: &'a [ModeData<'a>],
}

impl<'a> Waveform<'a> {
    /// Phase sequence for `(mode_index, range_index)`, or `None` when the
    /// definition does not cover that combination.
    pub fn phases(&self, mode_index: usize, range_index: usize) -> Option<&'a [WaveformPhase]> {
        let range = self.modes.get(mode_index)?.ranges.get(range_index)?;
        Some(range.phases)
    }

    /// Range index whose temperature window contains `temp` for `mode_index`.
    pub fn range_for_temperature(&self, mode_index: usize, temp: i8) -> Option<usize> {
        self.modes
            .get(mode_index)?
            .ranges
            .iter()
            .position(|r| temp >= r.temp_min && temp < r.temp_max)
    }
}
