use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::audio::Params;
use crate::core::scheduler::DEFAULT_RATE;
use crate::core::synth::DEFAULT_MASTER_GAIN;
use crate::error::{Result, SynthError};

const SETTINGS_DIR: &str = "rtsynth";
const SETTINGS_FILE: &str = "settings.json";

/// Persistent synthesizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub sample_rate: u32,
    pub channels: usize,
    pub block_count: usize,
    /// Interleaved samples per ring block
    pub block_samples: usize,
    /// Virtual ticks per wall-clock second
    pub scheduler_rate: f64,
    pub scheduler_tick_ms: u64,
    pub master_gain: f64,
    /// Channel live notes are played on
    pub live_channel: usize,
    pub lowpass_enabled: bool,
    pub lowpass_cutoff: f64,
    pub output_volume: f64,
    pub output_device: Option<String>,
    pub midi_port: Option<String>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            block_count: 8,
            block_samples: 512,
            scheduler_rate: DEFAULT_RATE,
            scheduler_tick_ms: 1,
            master_gain: DEFAULT_MASTER_GAIN,
            live_channel: 2,
            lowpass_enabled: false,
            lowpass_cutoff: 10000.0,
            output_volume: 1.0,
            output_device: None,
            midi_port: None,
        }
    }
}

impl SynthConfig {
    /// `<config dir>/rtsynth/settings.json`
    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| SynthError::InvalidConfig("could not find config directory".to_string()))?;
        path.push(SETTINGS_DIR);
        path.push(SETTINGS_FILE);
        Ok(path)
    }

    /// Load settings from `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        info!("loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path()?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SynthError::InvalidConfig(msg.to_string()));
        if self.sample_rate == 0 {
            return invalid("sample_rate must be positive");
        }
        if self.channels == 0 {
            return invalid("channels must be positive");
        }
        if self.block_count == 0 || self.block_samples == 0 {
            return invalid("ring blocks must be non-empty");
        }
        if self.block_samples % self.channels != 0 {
            return invalid("block_samples must hold whole frames");
        }
        if !(self.scheduler_rate > 0.0) {
            return invalid("scheduler_rate must be positive");
        }
        if self.scheduler_tick_ms == 0 {
            return invalid("scheduler_tick_ms must be positive");
        }
        Ok(())
    }

    /// Live knobs seeded from these settings
    pub fn params(&self) -> Params {
        Params::new(self.lowpass_cutoff, self.output_volume)
    }
}
