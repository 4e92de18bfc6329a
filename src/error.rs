//! Error types for negotiation, sample conversion and the duplex loop.

use thiserror::Error;

use crate::audio::{DriverError, StreamDirection};

/// Fatal setup failures raised while converging an endpoint configuration.
#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("[{direction}] open {device}: {source}")]
    DeviceOpenFailed {
        direction: StreamDirection,
        device: String,
        source: DriverError,
    },

    #[error("[{direction}] interleaved access rejected: {source}")]
    AccessModeUnsupported {
        direction: StreamDirection,
        source: DriverError,
    },

    #[error("[{direction}] no supported sample format (requested {requested})")]
    NoSupportedFormat {
        direction: StreamDirection,
        requested: String,
    },

    #[error("[{direction}] set_rate {rate}: {source}")]
    RateNegotiationFailed {
        direction: StreamDirection,
        rate: u32,
        source: DriverError,
    },

    #[error("[{direction}] set_channels {channels}: {source}")]
    ChannelCountUnsupported {
        direction: StreamDirection,
        channels: u32,
        source: DriverError,
    },

    #[error("[{direction}] hw_params: {source}")]
    HardwareParamsRejected {
        direction: StreamDirection,
        source: DriverError,
    },

    #[error("[{direction}] sw_params: {source}")]
    SoftwareParamsRejected {
        direction: StreamDirection,
        source: DriverError,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },
}

/// Failures that end the duplex loop (or keep it from starting).
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("channel count mismatch: capture {capture}, playback {playback}")]
    ChannelMismatch { capture: u32, playback: u32 },

    #[error("pipeline is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: crate::audio::PipelineState,
        actual: crate::audio::PipelineState,
    },

    #[error("[{direction}] prepare: {source}")]
    Prepare {
        direction: StreamDirection,
        source: DriverError,
    },

    #[error("[{direction}] start: {source}")]
    Start {
        direction: StreamDirection,
        source: DriverError,
    },

    #[error("{direction} recover failed: {source}")]
    RecoveryFailed {
        direction: StreamDirection,
        source: DriverError,
    },

    #[error("[{direction}] {op} error: {source}")]
    Io {
        direction: StreamDirection,
        op: &'static str,
        source: DriverError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}
