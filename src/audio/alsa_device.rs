//! ALSA PCM device wrappers for the duplex endpoints.

use alsa::pcm::{Access, Format, Frames, HwParams, State, PCM};
use alsa::{Direction, ValueOr};

use super::device::{
    DriverError, HwParamsSession, PcmBackend, PcmDevice, StreamDirection, StreamState,
};
use super::format::SampleFormat;

impl From<alsa::Error> for DriverError {
    fn from(e: alsa::Error) -> Self {
        DriverError::new(e.errno() as i32, e.to_string())
    }
}

fn alsa_format(format: SampleFormat) -> Format {
    match format {
        SampleFormat::S16 => Format::S16LE,
        SampleFormat::S24In32 => Format::S24LE,
        SampleFormat::S32 => Format::S32LE,
    }
}

/// Opens `hw:`/`plughw:`/named PCMs through libasound.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlsaBackend;

impl PcmBackend for AlsaBackend {
    type Device = AlsaPcm;

    fn open(&self, device: &str, direction: StreamDirection) -> Result<AlsaPcm, DriverError> {
        let dir = match direction {
            StreamDirection::Capture => Direction::Capture,
            StreamDirection::Playback => Direction::Playback,
        };
        // Blocking mode: readi/writei wait for a full period.
        let pcm = PCM::new(device, dir, false)?;
        log::debug!("ALSA {}: opened device={}", direction, device);
        Ok(AlsaPcm { pcm })
    }
}

pub struct AlsaPcm {
    pcm: PCM,
}

pub struct AlsaHwParams<'a> {
    pcm: &'a PCM,
    hw: HwParams<'a>,
}

impl HwParamsSession for AlsaHwParams<'_> {
    fn set_access_interleaved(&self) -> Result<(), DriverError> {
        Ok(self.hw.set_access(Access::RWInterleaved)?)
    }

    fn set_format(&self, format: SampleFormat) -> Result<(), DriverError> {
        Ok(self.hw.set_format(alsa_format(format))?)
    }

    fn set_rate_near(&self, rate: u32) -> Result<u32, DriverError> {
        Ok(self.hw.set_rate_near(rate, ValueOr::Nearest)?)
    }

    fn set_channels(&self, channels: u32) -> Result<(), DriverError> {
        Ok(self.hw.set_channels(channels)?)
    }

    fn set_period_size_near(&self, frames: usize) -> Result<usize, DriverError> {
        let actual = self
            .hw
            .set_period_size_near(frames as Frames, ValueOr::Nearest)?;
        Ok(actual as usize)
    }

    fn set_periods_near(&self, periods: u32) -> Result<u32, DriverError> {
        // Expressed as a buffer size so the driver can round to what it supports.
        let period = self.hw.get_period_size()?;
        let buffer = self.hw.set_buffer_size_near(period * periods as Frames)?;
        Ok((buffer / period) as u32)
    }

    fn commit(&self) -> Result<(), DriverError> {
        Ok(self.pcm.hw_params(&self.hw)?)
    }

    fn period_size(&self) -> Result<usize, DriverError> {
        Ok(self.hw.get_period_size()? as usize)
    }

    fn periods(&self) -> Result<u32, DriverError> {
        let period = self.hw.get_period_size()?;
        let buffer = self.hw.get_buffer_size()?;
        Ok((buffer / period) as u32)
    }
}

impl PcmDevice for AlsaPcm {
    type HwParams<'a> = AlsaHwParams<'a>;

    fn hw_params(&self) -> Result<AlsaHwParams<'_>, DriverError> {
        let hw = HwParams::any(&self.pcm)?;
        Ok(AlsaHwParams { pcm: &self.pcm, hw })
    }

    fn set_sw_params(&self, avail_min: usize, start_threshold: usize) -> Result<(), DriverError> {
        let swp = self.pcm.sw_params_current()?;
        swp.set_avail_min(avail_min as Frames)?;
        swp.set_start_threshold(start_threshold as Frames)?;
        Ok(self.pcm.sw_params(&swp)?)
    }

    fn state(&self) -> StreamState {
        match self.pcm.state() {
            State::Setup => StreamState::Setup,
            State::Prepared => StreamState::Prepared,
            State::Running => StreamState::Running,
            State::XRun => StreamState::Xrun,
            State::Suspended => StreamState::Suspended,
            _ => StreamState::Other,
        }
    }

    fn link(&self, other: &Self) -> Result<(), DriverError> {
        Ok(self.pcm.link(&other.pcm)?)
    }

    fn prepare(&self) -> Result<(), DriverError> {
        Ok(self.pcm.prepare()?)
    }

    fn start(&self) -> Result<(), DriverError> {
        Ok(self.pcm.start()?)
    }

    fn read_frames(&self, buf: &mut [u8]) -> Result<usize, DriverError> {
        Ok(self.pcm.io_bytes().readi(buf)?)
    }

    fn write_frames(&self, buf: &[u8]) -> Result<usize, DriverError> {
        Ok(self.pcm.io_bytes().writei(buf)?)
    }

    fn recover(&self, err: &DriverError) -> Result<(), DriverError> {
        // snd_pcm_recover takes the negative errno; silent = no stderr dump.
        Ok(self.pcm.recover(-err.errno, true)?)
    }
}
