use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    capture: Endpoint,
    playback: Endpoint,
    stream: Stream,
    realtime: Realtime,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Endpoint {
    device: String,
}

#[derive(Deserialize)]
struct Stream {
    sample_rate: u32,
    channels: u32,
    period_size: usize,
    period_count: u32,
    format: String,
}

#[derive(Deserialize)]
struct Realtime {
    priority: i32,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // Endpoints
    println!("cargo:rustc-env=DUPLEX_CAPTURE_DEVICE={}", config.capture.device);
    println!("cargo:rustc-env=DUPLEX_PLAYBACK_DEVICE={}", config.playback.device);

    // Stream parameters shared by both directions
    println!("cargo:rustc-env=DUPLEX_SAMPLE_RATE={}", config.stream.sample_rate);
    println!("cargo:rustc-env=DUPLEX_CHANNELS={}", config.stream.channels);
    println!("cargo:rustc-env=DUPLEX_PERIOD_SIZE={}", config.stream.period_size);
    println!("cargo:rustc-env=DUPLEX_PERIOD_COUNT={}", config.stream.period_count);
    println!("cargo:rustc-env=DUPLEX_FORMAT={}", config.stream.format);

    println!("cargo:rustc-env=DUPLEX_RT_PRIORITY={}", config.realtime.priority);
}
