use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use rtsynth::core::audio::{block_ring, list_output_devices, render_offline, OfflineRender};
use rtsynth::core::midi::MidiInputHandler;
use rtsynth::core::synth::ChannelMap;
use rtsynth::{
    AudioClock, BlockRenderer, MessageBus, Mixer, NoteRegistry, OutputDevice, RenderThread, Scheduler, Score,
    SynthConfig,
};

#[derive(Parser, Debug)]
#[command(version, about = "Real-time software synthesizer")]
struct Args {
    /// Settings file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a MIDI score on the output device
    Play { score: PathBuf },
    /// Play notes from a MIDI input port
    Live {
        /// Input port name (first available if omitted)
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Render a MIDI score to a WAV file
    Render {
        score: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, default_value_t = 300.0)]
        max_seconds: f64,
    },
    /// List audio outputs and MIDI inputs
    Devices,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SynthConfig::load(path),
        None => SynthConfig::load_default(),
    }
    .context("load settings")?;
    config.validate().context("check settings")?;

    match args.command {
        Command::Play { score } => play(&config, &score),
        Command::Live { port } => live(&config, port.or_else(|| config.midi_port.clone())),
        Command::Render {
            score,
            out,
            max_seconds,
        } => render(&config, &score, &out, max_seconds),
        Command::Devices => devices(),
    }
}

/// Device output fed by a render thread
struct Engine {
    registry: Arc<NoteRegistry>,
    clock: Arc<AudioClock>,
    params: Arc<rtsynth::Params>,
    active: Arc<AtomicBool>,
    render: RenderThread,
    _device: OutputDevice,
}

impl Engine {
    fn start(config: &SynthConfig) -> Result<Self> {
        let mut device = OutputDevice::open(config.output_device.as_deref()).context("open output device")?;
        let channels = device.channels();
        info!("rendering {channels} channels at {} Hz for '{}'", device.sample_rate(), device.name());

        let registry = Arc::new(NoteRegistry::new());
        let clock = Arc::new(AudioClock::new(device.sample_rate()));
        let params = Arc::new(config.params());
        let mixer = Mixer::with_channels(Arc::clone(&registry), ChannelMap::default(), config.master_gain);

        let mut renderer = BlockRenderer::new(Arc::new(mixer), Arc::clone(&clock), Arc::clone(&params), channels);
        if config.lowpass_enabled {
            renderer = renderer.with_lowpass();
        }

        let frames_per_block = config.block_samples / config.channels;
        let (producer, consumer) = block_ring(config.block_count, frames_per_block * channels);
        let active = Arc::new(AtomicBool::new(true));

        let render = RenderThread::spawn(renderer, producer, Arc::clone(&active)).context("start render thread")?;
        device
            .start(consumer, Arc::clone(&active))
            .context("start audio stream")?;

        Ok(Self {
            registry,
            clock,
            params,
            active,
            render,
            _device: device,
        })
    }

    fn scheduler(&self, score: Score, config: &SynthConfig) -> Scheduler {
        Scheduler::new(
            score.into_tracks(),
            config.scheduler_rate,
            Arc::clone(&self.registry),
            Arc::clone(&self.clock),
        )
    }

    fn stop(self) {
        if !self.render.is_active() {
            warn!("audio device stopped");
        }
        self.render.stop();
    }
}

fn play(config: &SynthConfig, path: &Path) -> Result<()> {
    let score = Score::from_file(path);
    if score.is_empty() {
        bail!("no playable notes in {}", path.display());
    }
    info!(
        "{}: format {}, {} tracks, {} note events",
        path.display(),
        score.format,
        score.tracks.len(),
        score.event_count()
    );

    let engine = Engine::start(config)?;
    let mut scheduler = engine.scheduler(score, config);
    scheduler.run(&engine.active, Duration::from_millis(config.scheduler_tick_ms), true);
    engine.stop();
    Ok(())
}

fn live(config: &SynthConfig, port: Option<String>) -> Result<()> {
    let bus = MessageBus::new();
    let mut input = MidiInputHandler::new(bus.sender(), config.live_channel);
    let port = match port {
        Some(name) => {
            input.connect_to_port(&name).context("connect MIDI input")?;
            name
        },
        None => input.connect_first().context("connect MIDI input")?,
    };

    let engine = Engine::start(config)?;
    let mut scheduler = engine
        .scheduler(Score::default(), config)
        .with_bus(bus, Arc::clone(&engine.params));
    info!("playing notes from '{port}' on channel {}", config.live_channel);
    scheduler.run(&engine.active, Duration::from_millis(config.scheduler_tick_ms), false);

    input.disconnect();
    engine.stop();
    Ok(())
}

fn render(config: &SynthConfig, path: &Path, out: &Path, max_seconds: f64) -> Result<()> {
    let score = Score::from_file(path);
    if score.is_empty() {
        bail!("no playable notes in {}", path.display());
    }
    let settings = OfflineRender::from_config(config, max_seconds);
    let summary = render_offline(score.into_tracks(), &settings, out)
        .with_context(|| format!("render {}", out.display()))?;
    if summary.truncated {
        warn!("stopped at the {max_seconds}s limit");
    }
    println!("wrote {:.2}s to {}", summary.seconds, out.display());
    Ok(())
}

fn devices() -> Result<()> {
    println!("Audio outputs:");
    for name in list_output_devices().context("list output devices")? {
        println!("  {name}");
    }
    println!("MIDI inputs:");
    for name in MidiInputHandler::list_ports().context("list MIDI inputs")? {
        println!("  {name}");
    }
    Ok(())
}
