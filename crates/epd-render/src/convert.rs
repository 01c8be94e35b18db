//! Row conversion: application pixels to panel drive bits
//!
//! Pure per-row functions, one per packing mode. Each output byte carries
//! the 2-bit drive state of 4 pixels; a drive state of `0b00` means "no
//! drive, keep previous particle position", which is why skipped rows,
//! padding rows and masked columns are simply zero-filled.

use epd_waveform::{DrawError, Packing};

/// Convert one row of `input` pixels through `lut` into `out`.
///
/// `input` and `out` need not cover a full panel row; callers pass the
/// covered byte ranges and the conversion stops at whichever side runs out
/// first. A `lut` of the wrong length for the packing zero-fills `out` and
/// reports [`DrawError::LUT_UNAVAILABLE`] — the row is driven as a no-op
/// and the cycle continues.
///
/// Converting the same input with the same table is deterministic; the
/// functions hold no state.
pub fn convert_line(packing: Packing, input: &[u8], lut: &[u8], out: &mut [u8]) -> DrawError {
    if lut.len() != packing.lut_len() {
        out.fill(0);
        return DrawError::LUT_UNAVAILABLE;
    }
    match packing {
        // One byte per pixel: `(from << 4) | to` transition code. The low
        // 2 bits of the table entry are the drive state; pixel i lands at
        // bit (i % 4) * 2 of output byte i / 4.
        Packing::Difference1PpB => {
            out.fill(0);
            let pixels = input.len().min(out.len() * 4);
            for (i, &px) in input[..pixels].iter().enumerate() {
                out[i / 4] |= (lut[px as usize] & 0b11) << ((i % 4) * 2);
            }
        }
        // Two 4-bit pixels per input byte; the table maps the byte to the
        // 4 drive bits of those two pixels, so two input bytes fill one
        // output byte.
        Packing::Gray2PpB => {
            out.fill(0);
            let bytes = input.len().min(out.len() * 2);
            for (i, &b) in input[..bytes].iter().enumerate() {
                out[i / 2] |= (lut[b as usize] & 0x0F) << ((i % 2) * 4);
            }
        }
        // Eight 1-bit pixels per input byte; the table is keyed by nibble
        // and yields a whole output byte, so one input byte expands to two
        // output bytes.
        Packing::Mono8PpB => {
            out.fill(0);
            for (i, &b) in input.iter().enumerate() {
                let lo = 2 * i;
                if lo >= out.len() {
                    break;
                }
                out[lo] = lut[(b & 0x0F) as usize];
                if lo + 1 < out.len() {
                    out[lo + 1] = lut[(b >> 4) as usize];
                }
            }
        }
    }
    DrawError::NONE
}

/// Zero the 2-bit drive lanes of all pixels outside `[start_x, end_x)`.
///
/// Used for updates that cover only part of a row: the covered byte range
/// is converted, then the stray pixels of the boundary bytes are masked
/// back to "no drive".
pub fn mask_line(out: &mut [u8], start_x: usize, end_x: usize) {
    for (byte_idx, byte) in out.iter_mut().enumerate() {
        let base = byte_idx * 4;
        if base >= start_x && base + 4 <= end_x {
            continue;
        }
        for p in 0..4 {
            let x = base + p;
            if x < start_x || x >= end_x {
                *byte &= !(0b11 << (p * 2));
            }
        }
    }
}
