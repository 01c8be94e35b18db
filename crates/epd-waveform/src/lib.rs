//! Waveform and drive-mode vocabulary for electrophoretic display pipelines
//!
//! Leaf crate shared between the frame delivery pipeline (`epd-render`),
//! hardware ports and the simulator. Defines:
//! - [`DrawMode`] / [`Packing`] — pixel packing and waveform-handling flags
//! - [`WaveformPhase`] and the per-mode/per-range phase tables
//! - [`LutBuilder`] — the contract for the external conversion-table science
//! - [`DrawError`] — the cycle-wide error-flag accumulator
//! - [`Rect`] — update-area geometry
//!
//! This crate is `no_std` by default; the `std` feature only widens error
//! trait impls. Waveform definitions are typically compiled into the firmware
//! image, so the phase tables borrow their storage from the caller.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod error;
pub mod geometry;
pub mod lut;
pub mod mode;
pub mod waveform;

pub use error::DrawError;
pub use geometry::Rect;
pub use lut::{ConstLutBuilder, LutBuilder};
pub use mode::{DrawMode, Packing};
pub use waveform::{ModeData, RangeData, Waveform, WaveformPhase};
