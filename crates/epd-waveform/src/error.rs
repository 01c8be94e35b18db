//! Cycle-wide error accumulation
//!
//! An update cycle must deliver every frame it promised to the pulse
//! generator, even when individual frames go wrong — stopping mid-cycle
//! would leave drive voltage on the panel. Recoverable per-frame errors are
//! therefore OR'd into a [`DrawError`] flag set and surfaced to the caller
//! only once the cycle has completed.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// Accumulated error flags for one update cycle.
///
/// Flags are sticky: once set they stay set until the next cycle starts.
/// Fatal conditions (row queue underrun) are not represented here — they
/// violate the real-time contract and panic instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawError(u32);

impl DrawError {
    /// No error recorded.
    pub const NONE: DrawError = DrawError(0);

    /// The draw mode selects no (or more than one) pixel packing.
    pub const INVALID_PACKING_MODE: DrawError = DrawError(1 << 0);

    /// No conversion table of the requested size/shape is available for
    /// this mode. Affected frames are driven as no-ops (all zero).
    pub const LUT_UNAVAILABLE: DrawError = DrawError(1 << 1);

    /// Unsupported area/crop/offset combination, or the pixel source is too
    /// small for the described area. Detected before the cycle is armed.
    pub const BAD_GEOMETRY: DrawError = DrawError(1 << 2);

    /// The phase table ran out before the cycle's last frame.
    pub const MISSING_PHASE: DrawError = DrawError(1 << 3);

    /// Recover a flag set from its raw representation.
    pub const fn from_bits(bits: u32) -> Self {
        DrawError(bits)
    }

    /// Raw flag bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when no flag is set.
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is also set in `self`.
    pub const fn contains(self, other: DrawError) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DrawError {
    type Output = DrawError;

    fn bitor(self, rhs: DrawError) -> DrawError {
        DrawError(self.0 | rhs.0)
    }
}

impl BitOrAssign for DrawError {
    fn bitor_assign(&mut self, rhs: DrawError) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "no error");
        }
        let mut first = true;
        let mut flag = |set: bool, name: &str, f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if set {
                if !first {
                    write!(f, " | ")?;
                }
                first = false;
                write!(f, "{}", name)?;
            }
            Ok(())
        };
        flag(
            self.contains(Self::INVALID_PACKING_MODE),
            "invalid packing mode",
            f,
        )?;
        flag(
            self.contains(Self::LUT_UNAVAILABLE),
            "conversion table unavailable",
            f,
        )?;
        flag(self.contains(Self::BAD_GEOMETRY), "bad geometry", f)?;
        flag(self.contains(Self::MISSING_PHASE), "missing phase", f)?;
        let known = Self::INVALID_PACKING_MODE
            | Self::LUT_UNAVAILABLE
            | Self::BAD_GEOMETRY
            | Self::MISSING_PHASE;
        let unknown = self.0 & !known.0;
        if unknown != 0 {
            flag(true, "unknown flags", f)?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DrawError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_ok() {
        assert!(DrawError::NONE.is_ok());
        assert_eq!(DrawError::NONE.bits(), 0);
    }

    #[test]
    fn test_flags_accumulate() {
        let mut err = DrawError::NONE;
        err |= DrawError::LUT_UNAVAILABLE;
        err |= DrawError::INVALID_PACKING_MODE;

        assert!(!err.is_ok());
        assert!(err.contains(DrawError::LUT_UNAVAILABLE));
        assert!(err.contains(DrawError::INVALID_PACKING_MODE));
        assert!(!err.contains(DrawError::BAD_GEOMETRY));
    }

    #[test]
    fn test_flags_are_sticky() {
        let mut err = DrawError::LUT_UNAVAILABLE;
        err |= DrawError::LUT_UNAVAILABLE;
        assert_eq!(err, DrawError::LUT_UNAVAILABLE);
    }

    #[test]
    fn test_roundtrip_bits() {
        let err = DrawError::BAD_GEOMETRY | DrawError::MISSING_PHASE;
        assert_eq!(DrawError::from_bits(err.bits()), err);
    }

    #[test]
    fn test_display_lists_flags() {
        let err = DrawError::INVALID_PACKING_MODE | DrawError::BAD_GEOMETRY;
        let text = format!("{}", err);
        assert!(text.contains("invalid packing mode"));
        assert!(text.contains("bad geometry"));
    }

    #[test]
    fn test_display_ok() {
        assert_eq!(format!("{}", DrawError::NONE), "no error");
    }
}
