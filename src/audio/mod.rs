//! audio - Duplex PCM passthrough engine
//!
//! Negotiates a capture and a playback endpoint over ALSA, converts every
//! period to canonical i32 samples, runs the processing stage and writes the
//! result back out, recovering from xruns in place.

mod alsa_device;
pub mod codec;
mod device;
#[cfg(test)]
mod fake;
mod format;
mod negotiate;
mod pipeline;
mod stage;

pub use alsa_device::AlsaBackend;
pub use device::{DriverError, DriverErrorKind, PcmBackend, PcmDevice, StreamDirection};
pub use format::{FormatFallback, SampleFormat};
pub use negotiate::{Endpoint, EndpointConfig, EndpointNegotiator, NegotiatedConfig};
pub use pipeline::{DuplexPipeline, PipelineState, PipelineStats};
pub use stage::{Attenuate, Passthrough, ProcessingStage};
