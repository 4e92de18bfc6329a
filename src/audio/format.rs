//! Hardware sample encodings and the format fallback policy.

use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

/// Little-endian signed integer wire formats the pipeline can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// 16-bit samples.
    S16,
    /// 24 significant bits, LSB-aligned in a 32-bit container.
    S24In32,
    /// 32-bit samples, identical to the canonical form.
    S32,
}

impl SampleFormat {
    /// Bytes one sample occupies on the wire.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S16 => 2,
            SampleFormat::S24In32 | SampleFormat::S32 => 4,
        }
    }

    /// ALSA-style name, used in negotiation notices.
    pub const fn alsa_name(self) -> &'static str {
        match self {
            SampleFormat::S16 => "S16_LE",
            SampleFormat::S24In32 => "S24_LE",
            SampleFormat::S32 => "S32_LE",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alsa_name())
    }
}

impl FromStr for SampleFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "S16" | "S16_LE" => Ok(SampleFormat::S16),
            "S24" | "S24-IN-32" | "S24_LE" => Ok(SampleFormat::S24In32),
            "S32" | "S32_LE" => Ok(SampleFormat::S32),
            _ => Err(CodecError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Ordered list of formats tried after the requested one is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatFallback {
    order: &'static [SampleFormat],
}

impl FormatFallback {
    pub const DEFAULT_ORDER: &'static [SampleFormat] =
        &[SampleFormat::S32, SampleFormat::S24In32, SampleFormat::S16];

    pub const fn new(order: &'static [SampleFormat]) -> Self {
        Self { order }
    }

    /// Fallback candidates, in priority order, excluding the rejected format.
    pub fn candidates(&self, rejected: SampleFormat) -> impl Iterator<Item = SampleFormat> + '_ {
        self.order.iter().copied().filter(move |&f| f != rejected)
    }
}

impl Default for FormatFallback {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ORDER)
    }
}
