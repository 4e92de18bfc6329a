//! Scripted in-memory PCM backend used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Once;

use super::device::{
    DriverError, HwParamsSession, PcmBackend, PcmDevice, StreamDirection, StreamState,
};
use super::format::SampleFormat;
use super::negotiate::{Endpoint, NegotiatedConfig};

#[derive(Debug, Clone)]
pub struct FakeCaps {
    pub formats: Vec<SampleFormat>,
    pub rates: Vec<u32>,
    pub channels: Vec<u32>,
    /// Forced period size, otherwise the request is echoed.
    pub period_size: Option<usize>,
    pub periods: Option<u32>,
    pub fail_open: bool,
    pub reject_access: bool,
    pub reject_commit: bool,
    pub reject_sw: bool,
}

impl Default for FakeCaps {
    fn default() -> Self {
        Self {
            formats: vec![SampleFormat::S16, SampleFormat::S24In32, SampleFormat::S32],
            rates: vec![44100, 48000],
            channels: vec![1, 2],
            period_size: None,
            periods: None,
            fail_open: false,
            reject_access: false,
            reject_commit: false,
            reject_sw: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    /// Copy these bytes into the front of the buffer and report the frames they hold.
    Data(Vec<u8>),
    Xrun,
    Suspend,
    Fail(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    /// Accept at most this many frames.
    Partial(usize),
    Xrun,
    Fail(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Open(StreamDirection),
    Link,
    Prepare(StreamDirection),
    Start(StreamDirection),
    Recover(StreamDirection),
    Close(StreamDirection),
}

/// Shared between the devices of one test and the test body.
#[derive(Debug)]
pub struct FakeLog {
    pub events: Vec<Event>,
    pub formats_tried: Vec<SampleFormat>,
    pub sw_params: Option<(usize, usize)>,
    pub reads: VecDeque<ReadStep>,
    pub writes: VecDeque<WriteStep>,
    /// Every byte the playback side accepted.
    pub written: Vec<u8>,
    pub reject_link: bool,
    pub fail_recover: bool,
    pub linked: bool,
    pub capture_state: StreamState,
    pub playback_state: StreamState,
}

impl Default for FakeLog {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            formats_tried: Vec::new(),
            sw_params: None,
            reads: VecDeque::new(),
            writes: VecDeque::new(),
            written: Vec::new(),
            reject_link: false,
            fail_recover: false,
            linked: false,
            capture_state: StreamState::Setup,
            playback_state: StreamState::Setup,
        }
    }
}

impl FakeLog {
    pub fn count(&self, event: Event) -> usize {
        self.events.iter().filter(|&&e| e == event).count()
    }

    fn state_mut(&mut self, direction: StreamDirection) -> &mut StreamState {
        match direction {
            StreamDirection::Capture => &mut self.capture_state,
            StreamDirection::Playback => &mut self.playback_state,
        }
    }

    fn start(&mut self, direction: StreamDirection) {
        *self.state_mut(direction) = StreamState::Running;
        if self.linked {
            self.capture_state = StreamState::Running;
            self.playback_state = StreamState::Running;
        }
    }
}

pub type SharedLog = Rc<RefCell<FakeLog>>;

pub struct FakeBackend {
    caps: FakeCaps,
    log: SharedLog,
}

impl FakeBackend {
    pub fn new(caps: FakeCaps) -> Self {
        Self {
            caps,
            log: SharedLog::default(),
        }
    }

    pub fn log(&self) -> SharedLog {
        Rc::clone(&self.log)
    }
}

impl PcmBackend for FakeBackend {
    type Device = FakeDevice;

    fn open(&self, _device: &str, direction: StreamDirection) -> Result<FakeDevice, DriverError> {
        if self.caps.fail_open {
            return Err(DriverError::new(libc::ENOENT, "No such file or directory"));
        }
        self.log.borrow_mut().events.push(Event::Open(direction));
        Ok(FakeDevice {
            direction,
            caps: self.caps.clone(),
            log: Rc::clone(&self.log),
            frame_bytes: Cell::new(0),
        })
    }
}

pub struct FakeDevice {
    direction: StreamDirection,
    caps: FakeCaps,
    log: SharedLog,
    frame_bytes: Cell<usize>,
}

/// An already-negotiated endpoint wired to `log`.
pub fn endpoint(
    log: &SharedLog,
    direction: StreamDirection,
    format: SampleFormat,
    channels: u32,
    period_size: usize,
) -> Endpoint<FakeDevice> {
    *log.borrow_mut().state_mut(direction) = StreamState::Prepared;
    let config = NegotiatedConfig {
        sample_rate: 48000,
        format,
        channels,
        period_size,
        period_count: 3,
    };
    Endpoint {
        device: FakeDevice {
            direction,
            caps: FakeCaps::default(),
            log: Rc::clone(log),
            frame_bytes: Cell::new(config.frame_bytes()),
        },
        name: "fake".into(),
        direction,
        config,
    }
}

fn xrun() -> DriverError {
    DriverError::new(libc::EPIPE, "Broken pipe")
}

impl PcmDevice for FakeDevice {
    type HwParams<'a> = FakeHwParams<'a>;

    fn hw_params(&self) -> Result<FakeHwParams<'_>, DriverError> {
        Ok(FakeHwParams {
            dev: self,
            format: Cell::new(None),
            channels: Cell::new(0),
            period_size: Cell::new(0),
            periods: Cell::new(0),
        })
    }

    fn set_sw_params(&self, avail_min: usize, start_threshold: usize) -> Result<(), DriverError> {
        if self.caps.reject_sw {
            return Err(DriverError::new(libc::EINVAL, "Invalid argument"));
        }
        self.log.borrow_mut().sw_params = Some((avail_min, start_threshold));
        Ok(())
    }

    fn state(&self) -> StreamState {
        match self.direction {
            StreamDirection::Capture => self.log.borrow().capture_state,
            StreamDirection::Playback => self.log.borrow().playback_state,
        }
    }

    fn link(&self, _other: &Self) -> Result<(), DriverError> {
        let mut log = self.log.borrow_mut();
        if log.reject_link {
            return Err(DriverError::new(libc::ENOSYS, "Function not implemented"));
        }
        log.linked = true;
        log.events.push(Event::Link);
        Ok(())
    }

    fn prepare(&self) -> Result<(), DriverError> {
        let mut log = self.log.borrow_mut();
        *log.state_mut(self.direction) = StreamState::Prepared;
        log.events.push(Event::Prepare(self.direction));
        Ok(())
    }

    fn start(&self) -> Result<(), DriverError> {
        let mut log = self.log.borrow_mut();
        log.start(self.direction);
        log.events.push(Event::Start(self.direction));
        Ok(())
    }

    fn read_frames(&self, buf: &mut [u8]) -> Result<usize, DriverError> {
        let mut log = self.log.borrow_mut();
        match log.reads.pop_front() {
            Some(ReadStep::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if log.capture_state == StreamState::Prepared {
                    log.start(StreamDirection::Capture);
                }
                Ok(n / self.frame_bytes.get())
            }
            Some(ReadStep::Xrun) => {
                log.capture_state = StreamState::Xrun;
                Err(xrun())
            }
            Some(ReadStep::Suspend) => {
                log.capture_state = StreamState::Suspended;
                Err(DriverError::new(libc::ESTRPIPE, "Streams pipe error"))
            }
            Some(ReadStep::Fail(errno)) => Err(DriverError::new(errno, "scripted read failure")),
            None => Err(DriverError::new(libc::EIO, "Input/output error")),
        }
    }

    fn write_frames(&self, buf: &[u8]) -> Result<usize, DriverError> {
        let mut log = self.log.borrow_mut();
        let frame_bytes = self.frame_bytes.get();
        let offered = buf.len() / frame_bytes;
        let accepted = match log.writes.pop_front() {
            None => offered,
            Some(WriteStep::Partial(max)) => offered.min(max),
            Some(WriteStep::Xrun) => {
                log.playback_state = StreamState::Xrun;
                return Err(xrun());
            }
            Some(WriteStep::Fail(errno)) => {
                return Err(DriverError::new(errno, "scripted write failure"));
            }
        };
        log.written.extend_from_slice(&buf[..accepted * frame_bytes]);
        // Auto-start at the start threshold.
        if log.playback_state == StreamState::Prepared {
            log.start(StreamDirection::Playback);
        }
        Ok(accepted)
    }

    fn recover(&self, _err: &DriverError) -> Result<(), DriverError> {
        let mut log = self.log.borrow_mut();
        log.events.push(Event::Recover(self.direction));
        if log.fail_recover {
            return Err(DriverError::new(libc::EBADFD, "File descriptor in bad state"));
        }
        *log.state_mut(self.direction) = StreamState::Prepared;
        Ok(())
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.log.borrow_mut().events.push(Event::Close(self.direction));
    }
}

pub struct FakeHwParams<'a> {
    dev: &'a FakeDevice,
    format: Cell<Option<SampleFormat>>,
    channels: Cell<u32>,
    period_size: Cell<usize>,
    periods: Cell<u32>,
}

fn einval() -> DriverError {
    DriverError::new(libc::EINVAL, "Invalid argument")
}

impl HwParamsSession for FakeHwParams<'_> {
    fn set_access_interleaved(&self) -> Result<(), DriverError> {
        if self.dev.caps.reject_access {
            return Err(einval());
        }
        Ok(())
    }

    fn set_format(&self, format: SampleFormat) -> Result<(), DriverError> {
        self.dev.log.borrow_mut().formats_tried.push(format);
        if !self.dev.caps.formats.contains(&format) {
            return Err(einval());
        }
        self.format.set(Some(format));
        Ok(())
    }

    fn set_rate_near(&self, rate: u32) -> Result<u32, DriverError> {
        self.dev
            .caps
            .rates
            .iter()
            .copied()
            .min_by_key(|r| r.abs_diff(rate))
            .ok_or_else(einval)
    }

    fn set_channels(&self, channels: u32) -> Result<(), DriverError> {
        if !self.dev.caps.channels.contains(&channels) {
            return Err(einval());
        }
        self.channels.set(channels);
        Ok(())
    }

    fn set_period_size_near(&self, frames: usize) -> Result<usize, DriverError> {
        let actual = self.dev.caps.period_size.unwrap_or(frames);
        self.period_size.set(actual);
        Ok(actual)
    }

    fn set_periods_near(&self, periods: u32) -> Result<u32, DriverError> {
        let actual = self.dev.caps.periods.unwrap_or(periods);
        self.periods.set(actual);
        Ok(actual)
    }

    fn commit(&self) -> Result<(), DriverError> {
        let format = self.format.get().ok_or_else(einval)?;
        if self.dev.caps.reject_commit {
            return Err(einval());
        }
        self.dev
            .frame_bytes
            .set(format.bytes_per_sample() * self.channels.get() as usize);
        *self.dev.log.borrow_mut().state_mut(self.dev.direction) = StreamState::Prepared;
        Ok(())
    }

    fn period_size(&self) -> Result<usize, DriverError> {
        Ok(self.period_size.get())
    }

    fn periods(&self) -> Result<u32, DriverError> {
        Ok(self.periods.get())
    }
}

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Global logger that keeps records per test thread.
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        RECORDS.with(|r| r.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Start recording log output on the current thread, dropping anything older.
pub fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
    RECORDS.with(|r| r.borrow_mut().clear());
}

/// Messages logged on this thread at exactly `level` since [`capture_logs`].
pub fn logged(level: log::Level) -> Vec<String> {
    RECORDS.with(|r| {
        r.borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    })
}
