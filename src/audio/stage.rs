//! The processing hook run once per period on canonical samples.

/// A transform over one period of interleaved canonical samples, in place.
///
/// Runs on the real-time thread: it must not block and must finish well
/// inside one period. Its output is forwarded to playback unchecked.
pub trait ProcessingStage {
    fn process(&mut self, block: &mut [i32], channels: u32);
}

/// Unity gain.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl ProcessingStage for Passthrough {
    fn process(&mut self, _block: &mut [i32], _channels: u32) {}
}

/// Integer attenuation: every sample divided by `divisor`.
#[derive(Debug, Clone, Copy)]
pub struct Attenuate {
    divisor: i32,
}

impl Attenuate {
    pub fn new(divisor: i32) -> Self {
        Self {
            divisor: divisor.max(1),
        }
    }
}

impl ProcessingStage for Attenuate {
    fn process(&mut self, block: &mut [i32], _channels: u32) {
        for s in block.iter_mut() {
            *s /= self.divisor;
        }
    }
}

impl<F> ProcessingStage for F
where
    F: FnMut(&mut [i32], u32),
{
    fn process(&mut self, block: &mut [i32], channels: u32) {
        self(block, channels)
    }
}
