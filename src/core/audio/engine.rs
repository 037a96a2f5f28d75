use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use super::{AudioClock, Params, RingProducer, SampleSource};
use crate::core::oscillator::LowPass;
use crate::error::Result;

/// Turns a `SampleSource` into interleaved output blocks.
///
/// Each frame asks the source for every output channel at the current clock
/// time, runs the optional low-pass, applies the volume knob, clamps to
/// [-1, 1] and advances the clock by one frame.
pub struct BlockRenderer {
    source: Arc<dyn SampleSource>,
    clock: Arc<AudioClock>,
    params: Arc<Params>,
    channels: usize,
    filters: Vec<LowPass>,
}

impl BlockRenderer {
    pub fn new(source: Arc<dyn SampleSource>, clock: Arc<AudioClock>, params: Arc<Params>, channels: usize) -> Self {
        Self {
            source,
            clock,
            params,
            channels: channels.max(1),
            filters: Vec::new(),
        }
    }

    /// Run every output channel through its own one-pole low-pass, tuned from
    /// the cutoff knob.
    pub fn with_lowpass(mut self) -> Self {
        let sample_rate = f64::from(self.clock.sample_rate());
        let cutoff = self.params.cutoff.get();
        self.filters = (0..self.channels).map(|_| LowPass::new(sample_rate, cutoff)).collect();
        self
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn clock(&self) -> &Arc<AudioClock> {
        &self.clock
    }

    /// Fill `block` with whole frames and return how many were rendered.
    /// Trailing samples that do not make up a frame are zeroed.
    pub fn render(&mut self, block: &mut [f32]) -> usize {
        let cutoff = self.params.cutoff.get();
        for filter in &mut self.filters {
            filter.set_cutoff(cutoff);
        }
        let volume = self.params.volume.get();

        let mut frames = block.chunks_exact_mut(self.channels);
        let mut rendered = 0;
        for frame in &mut frames {
            let time = self.clock.seconds();
            for (channel, out) in frame.iter_mut().enumerate() {
                let mut value = self.source.sample(channel, time);
                if let Some(filter) = self.filters.get_mut(channel) {
                    value = filter.process(value);
                }
                *out = (value * volume).clamp(-1.0, 1.0) as f32;
            }
            self.clock.advance(1);
            rendered += 1;
        }
        frames.into_remainder().fill(0.0);
        rendered
    }
}

/// Background thread that keeps the ring topped up while `active` is set
pub struct RenderThread {
    active: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RenderThread {
    pub fn spawn(mut renderer: BlockRenderer, mut producer: RingProducer, active: Arc<AtomicBool>) -> Result<Self> {
        let sample_rate = f64::from(renderer.clock().sample_rate());
        let frames_per_block = producer.block_samples() / renderer.channels();
        let block_time = Duration::from_secs_f64(frames_per_block.max(1) as f64 / sample_rate);

        let flag = Arc::clone(&active);
        let handle = thread::Builder::new().name("render".into()).spawn(move || {
            info!("render thread started ({frames_per_block} frames per block)");
            let mut reported_underruns = 0;

            while flag.load(Ordering::Acquire) {
                if !producer.wait_for_space(block_time) {
                    continue;
                }
                producer.push_block(|block| {
                    renderer.render(block);
                });

                let stats = producer.stats();
                if stats.underruns > reported_underruns {
                    warn!("output underrun ({} so far)", stats.underruns);
                    reported_underruns = stats.underruns;
                }
            }

            debug!("render thread stopped after {} blocks", producer.stats().blocks_played);
        })?;

        Ok(Self {
            active,
            handle: Some(handle),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Clear the active flag and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("render thread panicked");
            }
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
