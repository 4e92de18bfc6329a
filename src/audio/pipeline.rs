//! Lock-step capture -> process -> playback loop with xrun recovery.
//!
//! One thread, one period in flight: period N is read, converted, processed
//! and written before the read for period N+1 starts. The wire buffer holds
//! the captured bytes and is then overwritten in place with the playback
//! encoding, so it is sized for the wider of the two formats.

use std::sync::atomic::{AtomicBool, Ordering};

use super::codec;
use super::device::{DriverError, PcmDevice, StreamDirection, StreamState};
use super::negotiate::Endpoint;
use super::stage::ProcessingStage;
use crate::error::PipelineError;

/// Periods of silence queued on playback before the first start.
pub const PRIME_PERIODS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unstarted,
    Primed,
    Running,
    Recovering,
    Stopped,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub periods: u64,
    pub short_reads: u64,
    pub short_writes: u64,
    pub capture_recoveries: u64,
    pub playback_recoveries: u64,
}

pub struct DuplexPipeline<D: PcmDevice> {
    capture: Endpoint<D>,
    playback: Endpoint<D>,
    state: PipelineState,
    linked: bool,
    /// Frames per period, taken from the capture side.
    frames: usize,
    wire: Vec<u8>,
    block: Vec<i32>,
    stats: PipelineStats,
}

impl<D: PcmDevice> DuplexPipeline<D> {
    pub fn new(capture: Endpoint<D>, playback: Endpoint<D>) -> Result<Self, PipelineError> {
        let (cap, play) = (capture.config, playback.config);
        if cap.channels != play.channels {
            return Err(PipelineError::ChannelMismatch {
                capture: cap.channels,
                playback: play.channels,
            });
        }
        if cap.period_size != play.period_size {
            log::warn!(
                "Period size differs (CAP {} / PLAY {} frames); running at {} frames per period, priming in playback periods",
                cap.period_size,
                play.period_size,
                cap.period_size
            );
        }

        let frames = cap.period_size;
        let samples = frames * cap.channels as usize;
        let width = cap
            .format
            .bytes_per_sample()
            .max(play.format.bytes_per_sample());

        Ok(Self {
            capture,
            playback,
            state: PipelineState::Unstarted,
            linked: false,
            frames,
            wire: vec![0u8; samples * width],
            block: vec![0i32; samples],
            stats: PipelineStats::default(),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    fn expect_state(&self, expected: PipelineState) -> Result<(), PipelineError> {
        if self.state != expected {
            return Err(PipelineError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Link (or independently prepare) both endpoints and queue silence on playback.
    pub fn prime(&mut self) -> Result<(), PipelineError> {
        self.expect_state(PipelineState::Unstarted)?;

        match self.capture.device.link(&self.playback.device) {
            Ok(()) => {
                self.linked = true;
                log::info!("Linked CAP & PLAY for synchronous start.");
            }
            Err(e) => {
                log::info!("Endpoints not linked ({}), preparing independently", e);
                prepare(&self.playback)?;
                prepare(&self.capture)?;
            }
        }

        // Silence is counted in playback periods, written a wire buffer at a time.
        let bytes = self.frames * self.playback.config.frame_bytes();
        self.wire[..bytes].fill(0);
        let mut remaining = PRIME_PERIODS * self.playback.config.period_size;
        while remaining > 0 {
            let chunk = remaining.min(self.frames);
            if let Err(e) = self.write_frames(chunk) {
                self.state = PipelineState::Stopped;
                return Err(e);
            }
            remaining -= chunk;
        }

        self.state = PipelineState::Primed;
        Ok(())
    }

    /// Bring both endpoints to running. Primes first if that has not happened yet.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.state == PipelineState::Unstarted {
            self.prime()?;
        }
        self.expect_state(PipelineState::Primed)?;

        // Playback may already be running from priming; re-preparing it would drop the silence.
        for ep in [&self.capture, &self.playback] {
            if !matches!(ep.device.state(), StreamState::Prepared | StreamState::Running) {
                prepare(ep)?;
            }
        }
        // With a link, starting capture starts playback too.
        for ep in [&self.capture, &self.playback] {
            if ep.device.state() != StreamState::Running {
                ep.device.start().map_err(|source| PipelineError::Start {
                    direction: ep.direction,
                    source,
                })?;
            }
        }

        self.state = PipelineState::Running;
        log::info!(
            "Running: {} frames/period, CAP {} -> PLAY {}",
            self.frames,
            self.capture.config.format,
            self.playback.config.format
        );
        Ok(())
    }

    /// One capture -> decode -> process -> encode -> playback iteration.
    pub fn run_period<S>(&mut self, stage: &mut S) -> Result<(), PipelineError>
    where
        S: ProcessingStage + ?Sized,
    {
        self.expect_state(PipelineState::Running)?;
        let result = self.cycle(stage);
        if result.is_err() {
            self.state = PipelineState::Stopped;
        }
        result
    }

    fn cycle<S>(&mut self, stage: &mut S) -> Result<(), PipelineError>
    where
        S: ProcessingStage + ?Sized,
    {
        let (cap, play) = (self.capture.config, self.playback.config);

        self.read_period()?;
        codec::decode(cap.format, &self.wire[..self.frames * cap.frame_bytes()], &mut self.block)?;

        stage.process(&mut self.block, cap.channels);

        codec::encode(&self.block, play.format, &mut self.wire[..self.frames * play.frame_bytes()])?;
        self.write_period()?;

        self.stats.periods += 1;
        Ok(())
    }

    /// Run periods until `running` is cleared or a fatal error occurs.
    pub fn run<S>(&mut self, stage: &mut S, running: &AtomicBool) -> Result<(), PipelineError>
    where
        S: ProcessingStage + ?Sized,
    {
        while running.load(Ordering::Relaxed) {
            if let Err(e) = self.run_period(stage) {
                log::error!("{}", e);
                return Err(e);
            }
        }
        self.state = PipelineState::Stopped;
        Ok(())
    }

    /// Close both endpoints and release the buffers.
    pub fn shutdown(self) -> PipelineStats {
        let stats = self.stats;
        log::info!(
            "Stopped after {} periods (short reads {}, short writes {}, recoveries CAP {} / PLAY {})",
            stats.periods,
            stats.short_reads,
            stats.short_writes,
            stats.capture_recoveries,
            stats.playback_recoveries
        );
        stats
    }

    fn read_period(&mut self) -> Result<(), PipelineError> {
        let frame_bytes = self.capture.config.frame_bytes();
        let len = self.frames * frame_bytes;
        loop {
            match self.capture.device.read_frames(&mut self.wire[..len]) {
                Ok(n) if n >= self.frames => return Ok(()),
                Ok(n) => {
                    self.stats.short_reads += 1;
                    log::debug!("[CAP] short read {}/{} frames", n, self.frames);
                    zero_fill_tail(&mut self.wire[..len], n * frame_bytes);
                    return Ok(());
                }
                Err(e) if e.is_recoverable() => {
                    self.stats.capture_recoveries += 1;
                    recover(&self.capture, e, &mut self.state)?;
                }
                Err(source) => {
                    return Err(PipelineError::Io {
                        direction: StreamDirection::Capture,
                        op: "read",
                        source,
                    });
                }
            }
        }
    }

    fn write_period(&mut self) -> Result<(), PipelineError> {
        self.write_frames(self.frames)
    }

    /// Write the first `frames` frames of the wire buffer, completing short writes.
    fn write_frames(&mut self, frames: usize) -> Result<(), PipelineError> {
        let frame_bytes = self.playback.config.frame_bytes();
        let len = frames * frame_bytes;
        let mut written = 0;
        while written < frames {
            match self.playback.device.write_frames(&self.wire[written * frame_bytes..len]) {
                Ok(0) => {
                    return Err(PipelineError::Io {
                        direction: StreamDirection::Playback,
                        op: "write",
                        source: DriverError::new(libc::EIO, "driver accepted no frames"),
                    });
                }
                Ok(n) => {
                    if n < frames - written {
                        self.stats.short_writes += 1;
                    }
                    written += n;
                }
                Err(e) if e.is_recoverable() => {
                    self.stats.playback_recoveries += 1;
                    recover(&self.playback, e, &mut self.state)?;
                }
                Err(source) => {
                    return Err(PipelineError::Io {
                        direction: StreamDirection::Playback,
                        op: "write",
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}

fn prepare<D: PcmDevice>(ep: &Endpoint<D>) -> Result<(), PipelineError> {
    ep.device.prepare().map_err(|source| PipelineError::Prepare {
        direction: ep.direction,
        source,
    })
}

/// Run the driver's silent recovery; the caller retries the same read or write.
fn recover<D: PcmDevice>(
    ep: &Endpoint<D>,
    err: DriverError,
    state: &mut PipelineState,
) -> Result<(), PipelineError> {
    let resume = *state;
    *state = PipelineState::Recovering;
    log::warn!("[{}] {:?} ({}), recovering...", ep.direction, err.kind(), err);

    match ep.device.recover(&err) {
        Ok(()) => {
            *state = resume;
            Ok(())
        }
        Err(source) => {
            log::error!("{} recover failed: {}", ep.direction, source);
            *state = PipelineState::Stopped;
            Err(PipelineError::RecoveryFailed {
                direction: ep.direction,
                source,
            })
        }
    }
}

/// Zero everything past the first `valid` bytes.
fn zero_fill_tail(buf: &mut [u8], valid: usize) {
    let from = valid.min(buf.len());
    buf[from..].fill(0);
}
