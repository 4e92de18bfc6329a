use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;

use duplex_wire::audio::{
    AlsaBackend, Attenuate, DuplexPipeline, EndpointNegotiator, Passthrough, ProcessingStage,
    SampleFormat, StreamDirection,
};
use duplex_wire::config::{Config, Overrides};
use duplex_wire::realtime::{self, NoRealtime, PosixRealtime, RealtimeBootstrap};

#[derive(Parser, Debug)]
#[command(name = "duplex_wire")]
#[command(version, about = "Real-time ALSA capture -> DSP -> playback passthrough", long_about = None)]
struct Cli {
    /// Capture device, e.g. hw:1,0
    #[arg(long = "cap")]
    capture: Option<String>,

    /// Playback device
    #[arg(long = "play")]
    playback: Option<String>,

    /// Sample rate in Hz
    #[arg(long)]
    rate: Option<u32>,

    /// Channel count
    #[arg(long = "ch")]
    channels: Option<u32>,

    /// Period size in frames
    #[arg(long)]
    period: Option<usize>,

    /// Number of periods in the hardware buffer
    #[arg(long)]
    periods: Option<u32>,

    /// Sample format: S32, S24-in-32 or S16 (S32_LE, S24_LE, S16_LE also accepted)
    #[arg(long)]
    format: Option<SampleFormat>,

    /// Divide every sample by this value instead of passing audio through unchanged
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    attenuate: Option<i32>,

    /// Skip memory locking and SCHED_FIFO
    #[arg(long)]
    no_realtime: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            capture_device: self.capture.clone(),
            playback_device: self.playback.clone(),
            sample_rate: self.rate,
            channels: self.channels,
            period_size: self.period,
            period_count: self.periods,
            format: self.format,
        }
    }
}

fn main() -> ExitCode {
    // 初始化日志，默认 info，输出到 stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::new()
        .map_err(anyhow::Error::msg)?
        .apply(cli.overrides());

    // Before any device is opened.
    let bootstrap: Box<dyn RealtimeBootstrap> = if cli.no_realtime {
        Box::new(NoRealtime)
    } else {
        Box::new(PosixRealtime {
            priority: config.rt_priority,
        })
    };
    realtime::enter_realtime(bootstrap.as_ref());

    let backend = AlsaBackend;
    let negotiator = EndpointNegotiator::new(&backend);
    let capture = negotiator
        .negotiate(&config.endpoint(StreamDirection::Capture))
        .context("capture endpoint")?;
    let playback = negotiator
        .negotiate(&config.endpoint(StreamDirection::Playback))
        .context("playback endpoint")?;

    log::info!(
        "Negotiated:\n  CAP : {}\n  PLAY: {}",
        capture.config,
        playback.config
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Stopping...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install signal handler")?;

    let mut stage: Box<dyn ProcessingStage> = match cli.attenuate {
        Some(divisor) => Box::new(Attenuate::new(divisor)),
        None => Box::new(Passthrough),
    };

    let mut pipeline = DuplexPipeline::new(capture, playback)?;
    let result = match pipeline.start() {
        Ok(()) => pipeline.run(stage.as_mut(), &running),
        Err(e) => Err(e),
    };
    pipeline.shutdown();

    result.context("duplex loop")
}
