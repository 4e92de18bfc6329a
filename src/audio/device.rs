//! Driver-facing traits for PCM endpoints.
//!
//! `AlsaBackend` implements these on top of libasound; tests use a scripted
//! fake. Everything above this module is driver-agnostic.

use std::fmt;

use thiserror::Error;

use super::format::SampleFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamDirection {
    Capture,
    Playback,
}

impl fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamDirection::Capture => "CAP",
            StreamDirection::Playback => "PLAY",
        })
    }
}

/// Coarse stream state as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Setup,
    Prepared,
    Running,
    Xrun,
    Suspended,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Buffer underrun (playback) or overrun (capture).
    Xrun,
    /// Stream suspended by power management.
    Suspended,
    Other,
}

/// An error reported by the audio driver, with its errno and description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    /// Positive errno value.
    pub errno: i32,
    pub message: String,
}

impl DriverError {
    pub fn new(errno: i32, message: impl Into<String>) -> Self {
        Self {
            errno: errno.abs(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DriverErrorKind {
        match self.errno {
            libc::EPIPE => DriverErrorKind::Xrun,
            libc::ESTRPIPE => DriverErrorKind::Suspended,
            _ => DriverErrorKind::Other,
        }
    }

    /// Whether the driver's recovery primitive can handle this error.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != DriverErrorKind::Other
    }
}

/// Opens PCM devices by name.
pub trait PcmBackend {
    type Device: PcmDevice;

    fn open(&self, device: &str, direction: StreamDirection) -> Result<Self::Device, DriverError>;
}

/// Hardware-parameter negotiation on an open device.
///
/// The `*_near` calls return the value the driver actually accepted.
pub trait HwParamsSession {
    fn set_access_interleaved(&self) -> Result<(), DriverError>;
    fn set_format(&self, format: SampleFormat) -> Result<(), DriverError>;
    fn set_rate_near(&self, rate: u32) -> Result<u32, DriverError>;
    fn set_channels(&self, channels: u32) -> Result<(), DriverError>;
    fn set_period_size_near(&self, frames: usize) -> Result<usize, DriverError>;
    fn set_periods_near(&self, periods: u32) -> Result<u32, DriverError>;

    /// Install the accumulated parameters on the device.
    fn commit(&self) -> Result<(), DriverError>;

    /// Committed period size in frames.
    fn period_size(&self) -> Result<usize, DriverError>;
    /// Committed period count.
    fn periods(&self) -> Result<u32, DriverError>;
}

/// An open PCM endpoint with interleaved, blocking byte I/O.
pub trait PcmDevice {
    type HwParams<'a>: HwParamsSession
    where
        Self: 'a;

    fn hw_params(&self) -> Result<Self::HwParams<'_>, DriverError>;
    fn set_sw_params(&self, avail_min: usize, start_threshold: usize) -> Result<(), DriverError>;

    fn state(&self) -> StreamState;
    /// Tie `other` to this endpoint so both start with one call.
    fn link(&self, other: &Self) -> Result<(), DriverError>;
    fn prepare(&self) -> Result<(), DriverError>;
    fn start(&self) -> Result<(), DriverError>;

    /// Read up to `buf.len()` bytes worth of frames; returns frames read.
    fn read_frames(&self, buf: &mut [u8]) -> Result<usize, DriverError>;
    /// Write up to `buf.len()` bytes worth of frames; returns frames written.
    fn write_frames(&self, buf: &[u8]) -> Result<usize, DriverError>;

    /// Silent recovery from xrun/suspend.
    fn recover(&self, err: &DriverError) -> Result<(), DriverError>;
}
