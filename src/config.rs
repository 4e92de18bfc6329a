use crate::audio::{EndpointConfig, SampleFormat, StreamDirection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // 设备
    pub capture_device: String,
    pub playback_device: String,

    // 两个方向共用的流参数
    pub sample_rate: u32,
    pub channels: u32,
    pub period_size: usize,
    pub period_count: u32,
    pub format: SampleFormat,

    // SCHED_FIFO 优先级
    pub rt_priority: i32,
}

/// Runtime overrides layered on top of the build-time defaults.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub capture_device: Option<String>,
    pub playback_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub period_size: Option<usize>,
    pub period_count: Option<u32>,
    pub format: Option<SampleFormat>,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            capture_device: env!("DUPLEX_CAPTURE_DEVICE").to_string(),
            playback_device: env!("DUPLEX_PLAYBACK_DEVICE").to_string(),

            sample_rate: env!("DUPLEX_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse DUPLEX_SAMPLE_RATE")?,
            channels: env!("DUPLEX_CHANNELS").parse()
                .map_err(|_| "Failed to parse DUPLEX_CHANNELS")?,
            period_size: env!("DUPLEX_PERIOD_SIZE").parse()
                .map_err(|_| "Failed to parse DUPLEX_PERIOD_SIZE")?,
            period_count: env!("DUPLEX_PERIOD_COUNT").parse()
                .map_err(|_| "Failed to parse DUPLEX_PERIOD_COUNT")?,
            format: env!("DUPLEX_FORMAT").parse()
                .map_err(|_| "Failed to parse DUPLEX_FORMAT")?,

            rt_priority: env!("DUPLEX_RT_PRIORITY").parse()
                .map_err(|_| "Failed to parse DUPLEX_RT_PRIORITY")?,
        })
    }

    pub fn apply(mut self, o: Overrides) -> Self {
        if let Some(v) = o.capture_device {
            self.capture_device = v;
        }
        if let Some(v) = o.playback_device {
            self.playback_device = v;
        }
        self.sample_rate = o.sample_rate.unwrap_or(self.sample_rate);
        self.channels = o.channels.unwrap_or(self.channels);
        self.period_size = o.period_size.unwrap_or(self.period_size);
        self.period_count = o.period_count.unwrap_or(self.period_count);
        self.format = o.format.unwrap_or(self.format);
        self
    }

    /// The request for one direction; both share everything but the device.
    pub fn endpoint(&self, direction: StreamDirection) -> EndpointConfig {
        let device = match direction {
            StreamDirection::Capture => &self.capture_device,
            StreamDirection::Playback => &self.playback_device,
        };
        EndpointConfig {
            device: device.clone(),
            direction,
            sample_rate: self.sample_rate,
            format: self.format,
            channels: self.channels,
            period_size: self.period_size,
            period_count: self.period_count,
        }
    }
}
