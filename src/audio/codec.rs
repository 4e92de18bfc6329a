//! Bit-exact conversion between wire formats and canonical i32 samples.
//!
//! Canonical samples are full scale at bit 31 whatever the hardware format:
//!
//! - S16      -> sample << 16
//! - S24_LE   -> (container << 8), the top byte of the container is ignored
//! - S32      -> passthrough
//!
//! Canonical S24 is therefore not LSB-aligned: a stage sees 24-bit audio at
//! the same level as 16- and 32-bit audio, scaled by 256 relative to the
//! container value.
//!
//! Encoding is the inverse arithmetic shift, so precision below the wire
//! format's resolution is dropped (round toward negative infinity).

use super::format::SampleFormat;
use crate::error::CodecError;

fn check_len(format: SampleFormat, wire_len: usize, samples: usize) -> Result<(), CodecError> {
    let expected = samples * format.bytes_per_sample();
    if wire_len != expected {
        return Err(CodecError::BufferSize {
            expected,
            actual: wire_len,
        });
    }
    Ok(())
}

/// Decode `out.len()` samples from `wire` into canonical form.
pub fn decode(format: SampleFormat, wire: &[u8], out: &mut [i32]) -> Result<(), CodecError> {
    check_len(format, wire.len(), out.len())?;

    match format {
        SampleFormat::S32 => {
            for (dst, src) in out.iter_mut().zip(wire.chunks_exact(4)) {
                *dst = i32::from_le_bytes([src[0], src[1], src[2], src[3]]);
            }
        }
        SampleFormat::S16 => {
            for (dst, src) in out.iter_mut().zip(wire.chunks_exact(2)) {
                *dst = i32::from(i16::from_le_bytes([src[0], src[1]])) << 16;
            }
        }
        SampleFormat::S24In32 => {
            for (dst, src) in out.iter_mut().zip(wire.chunks_exact(4)) {
                // Bit 23 lands on bit 31; the container's top byte is discarded.
                *dst = i32::from_le_bytes([src[0], src[1], src[2], src[3]]) << 8;
            }
        }
    }
    Ok(())
}

/// Encode canonical samples into `wire` using `format`.
pub fn encode(block: &[i32], format: SampleFormat, wire: &mut [u8]) -> Result<(), CodecError> {
    check_len(format, wire.len(), block.len())?;

    match format {
        SampleFormat::S32 => {
            for (src, dst) in block.iter().zip(wire.chunks_exact_mut(4)) {
                dst.copy_from_slice(&src.to_le_bytes());
            }
        }
        SampleFormat::S16 => {
            for (src, dst) in block.iter().zip(wire.chunks_exact_mut(2)) {
                // An i32 shifted right by 16 always fits in i16.
                let v = (*src >> 16) as i16;
                dst.copy_from_slice(&v.to_le_bytes());
            }
        }
        SampleFormat::S24In32 => {
            for (src, dst) in block.iter().zip(wire.chunks_exact_mut(4)) {
                // Sign-extended, LSB-aligned 24-bit value.
                dst.copy_from_slice(&(*src >> 8).to_le_bytes());
            }
        }
    }
    Ok(())
}
