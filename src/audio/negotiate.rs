//! Converges a requested endpoint configuration onto what the device accepts.

use std::fmt;

use super::device::{DriverError, HwParamsSession, PcmBackend, PcmDevice, StreamDirection};
use super::format::{FormatFallback, SampleFormat};
use crate::error::NegotiationError;

/// What we would like one endpoint to run at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub device: String,
    pub direction: StreamDirection,
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub channels: u32,
    /// Frames per period.
    pub period_size: usize,
    pub period_count: u32,
}

/// Parameters the driver confirmed for an opened endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedConfig {
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub channels: u32,
    pub period_size: usize,
    pub period_count: u32,
}

impl NegotiatedConfig {
    /// Bytes per interleaved frame on the wire.
    pub fn frame_bytes(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }

    /// Bytes one period occupies on the wire.
    pub fn period_bytes(&self) -> usize {
        self.frame_bytes() * self.period_size
    }
}

impl fmt::Display for NegotiatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Hz ch={} period={} periods={}",
            self.format, self.sample_rate, self.channels, self.period_size, self.period_count
        )
    }
}

/// An open device together with the configuration it was committed with.
pub struct Endpoint<D> {
    pub device: D,
    pub name: String,
    pub direction: StreamDirection,
    pub config: NegotiatedConfig,
}

impl<D> fmt::Debug for Endpoint<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

pub struct EndpointNegotiator<'b, B> {
    backend: &'b B,
    fallback: FormatFallback,
}

impl<'b, B: PcmBackend> EndpointNegotiator<'b, B> {
    pub fn new(backend: &'b B) -> Self {
        Self {
            backend,
            fallback: FormatFallback::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: FormatFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Open `request.device` and negotiate hardware and software parameters.
    pub fn negotiate(
        &self,
        request: &EndpointConfig,
    ) -> Result<Endpoint<B::Device>, NegotiationError> {
        let direction = request.direction;
        let device = self
            .backend
            .open(&request.device, direction)
            .map_err(|source| NegotiationError::DeviceOpenFailed {
                direction,
                device: request.device.clone(),
                source,
            })?;

        let config = {
            let hw = device
                .hw_params()
                .map_err(|source| NegotiationError::HardwareParamsRejected { direction, source })?;
            self.configure_hw(&hw, request)?
        };

        device
            .set_sw_params(config.period_size, config.period_size)
            .map_err(|source| NegotiationError::SoftwareParamsRejected { direction, source })?;

        Ok(Endpoint {
            device,
            name: request.device.clone(),
            direction,
            config,
        })
    }

    fn configure_hw<H: HwParamsSession>(
        &self,
        hw: &H,
        request: &EndpointConfig,
    ) -> Result<NegotiatedConfig, NegotiationError> {
        let direction = request.direction;

        hw.set_access_interleaved()
            .map_err(|source| NegotiationError::AccessModeUnsupported { direction, source })?;

        let format = self.negotiate_format(hw, request)?;

        let sample_rate = hw.set_rate_near(request.sample_rate).map_err(|source| {
            NegotiationError::RateNegotiationFailed {
                direction,
                rate: request.sample_rate,
                source,
            }
        })?;
        if sample_rate != request.sample_rate {
            log::info!("[{}] Info: switching rate to supported {}", direction, sample_rate);
        }

        hw.set_channels(request.channels).map_err(|source| {
            NegotiationError::ChannelCountUnsupported {
                direction,
                channels: request.channels,
                source,
            }
        })?;

        // Period geometry is a hint; whatever the driver settles on is read back after commit.
        if let Err(e) = hw.set_period_size_near(request.period_size) {
            log::warn!("[{}] set_period {}: {}", direction, request.period_size, e);
        }
        if let Err(e) = hw.set_periods_near(request.period_count) {
            log::warn!("[{}] set_periods {}: {}", direction, request.period_count, e);
        }

        let rejected = |source: DriverError| NegotiationError::HardwareParamsRejected { direction, source };
        hw.commit().map_err(rejected)?;
        let period_size = hw.period_size().map_err(rejected)?;
        let period_count = hw.periods().map_err(rejected)?;

        Ok(NegotiatedConfig {
            sample_rate,
            format,
            channels: request.channels,
            period_size,
            period_count,
        })
    }

    fn negotiate_format<H: HwParamsSession>(
        &self,
        hw: &H,
        request: &EndpointConfig,
    ) -> Result<SampleFormat, NegotiationError> {
        let direction = request.direction;
        match hw.set_format(request.format) {
            Ok(()) => return Ok(request.format),
            Err(e) => log::debug!("[{}] set_format {}: {}", direction, request.format, e),
        }

        for candidate in self.fallback.candidates(request.format) {
            if hw.set_format(candidate).is_ok() {
                log::info!("[{}] Info: switching format to supported {}", direction, candidate);
                return Ok(candidate);
            }
        }

        log::error!("[{}] No supported format.", direction);
        Err(NegotiationError::NoSupportedFormat {
            direction,
            requested: request.format.to_string(),
        })
    }
}
