//! duplex_wire - real-time ALSA duplex passthrough
//!
//! capture -> canonical i32 -> processing stage -> playback, one period at a
//! time on a single thread.

pub mod audio;
pub mod config;
pub mod error;
pub mod realtime;
