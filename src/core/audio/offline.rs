use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use log::info;

use super::{AudioClock, BlockRenderer, Params};
use crate::config::SynthConfig;
use crate::core::scheduler::Scheduler;
use crate::core::score::ChannelTrack;
use crate::core::synth::{ChannelMap, Mixer, NoteRegistry};
use crate::error::Result;

/// Settings for rendering a score straight to a WAV file
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineRender {
    pub sample_rate: u32,
    pub channels: usize,
    /// Frames rendered between scheduler ticks
    pub block_frames: usize,
    pub scheduler_rate: f64,
    pub master_gain: f64,
    pub lowpass: bool,
    pub cutoff: f64,
    pub volume: f64,
    /// Hard stop, in seconds of audio
    pub max_seconds: f64,
}

impl OfflineRender {
    pub fn from_config(config: &SynthConfig, max_seconds: f64) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            block_frames: (config.block_samples / config.channels.max(1)).max(1),
            scheduler_rate: config.scheduler_rate,
            master_gain: config.master_gain,
            lowpass: config.lowpass_enabled,
            cutoff: config.lowpass_cutoff,
            volume: config.output_volume,
            max_seconds,
        }
    }
}

/// What an offline render produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    pub seconds: f64,
    /// Stopped at `max_seconds` with events or notes left
    pub truncated: bool,
}

/// Play `tracks` through the scheduler and mixer on a simulated clock and
/// write 16-bit PCM to `path`.
///
/// Each block of audio counts as the wall-clock time it covers, so the result
/// matches real-time playback without the jitter. Rendering ends once the
/// score is drained and every note has faded, or at `max_seconds`.
pub fn render_offline(tracks: Vec<ChannelTrack>, settings: &OfflineRender, path: &Path) -> Result<RenderSummary> {
    let channels = settings.channels.max(1);
    let block_frames = settings.block_frames.max(1);

    let registry = Arc::new(NoteRegistry::new());
    let clock = Arc::new(AudioClock::new(settings.sample_rate));
    let params = Arc::new(Params::new(settings.cutoff, settings.volume));
    let mixer = Mixer::with_channels(Arc::clone(&registry), ChannelMap::default(), settings.master_gain);

    let mut scheduler = Scheduler::new(tracks, settings.scheduler_rate, Arc::clone(&registry), Arc::clone(&clock));
    let mut renderer = BlockRenderer::new(Arc::new(mixer), Arc::clone(&clock), params, channels);
    if settings.lowpass {
        renderer = renderer.with_lowpass();
    }

    let spec = WavSpec {
        channels: channels as u16,
        sample_rate: settings.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;

    let block_time = Duration::from_secs_f64(block_frames as f64 / f64::from(settings.sample_rate));
    let max_frames = (settings.max_seconds.max(0.0) * f64::from(settings.sample_rate)) as u64;
    let mut block = vec![0.0f32; block_frames * channels];

    scheduler.advance(Duration::ZERO);
    let mut truncated = true;
    while clock.frames() < max_frames {
        let frames = renderer.render(&mut block);
        for sample in &block[..frames * channels] {
            writer.write_sample((sample * f32::from(i16::MAX)) as i16)?;
        }
        scheduler.advance(block_time);

        if scheduler.is_finished() && registry.is_empty() {
            truncated = false;
            break;
        }
    }
    writer.finalize()?;

    let summary = RenderSummary {
        frames: clock.frames(),
        seconds: clock.seconds(),
        truncated,
    };
    info!(
        "rendered {:.2}s ({} frames) to {}{}",
        summary.seconds,
        summary.frames,
        path.display(),
        if truncated { ", cut at time limit" } else { "" }
    );
    Ok(summary)
}
