//! Audio-side glue: transport clock, render thread, buffering and device output

mod backend;
mod engine;
mod offline;
mod params;
mod ring;

pub use backend::{list_output_devices, OutputDevice};
pub use engine::{BlockRenderer, RenderThread};
pub use offline::{render_offline, OfflineRender, RenderSummary};
pub use params::{Knob, Params};
pub use ring::{block_ring, RingConsumer, RingProducer, RingStats};

use std::sync::atomic::{AtomicU64, Ordering};

/// Anything that can produce a sample for an output channel at a transport time
pub trait SampleSource: Send + Sync {
    fn sample(&self, channel: usize, time: f64) -> f64;
}

/// Transport clock shared between the render thread and the scheduler.
///
/// Only the render thread advances it; everybody else reads `seconds()`.
#[derive(Debug)]
pub struct AudioClock {
    frames: AtomicU64,
    sample_rate: u32,
}

impl AudioClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn seconds(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_counts_frames_as_seconds() {
        let clock = AudioClock::new(48000);
        assert_eq!(clock.seconds(), 0.0);
        clock.advance(24000);
        assert_eq!(clock.frames(), 24000);
        assert_eq!(clock.seconds(), 0.5);
    }
}
