//! A small real-time software synthesizer.
//!
//! A scheduling thread turns score events and live MIDI input into note
//! transitions on a shared [`NoteRegistry`]; a render thread mixes the
//! registered notes into blocks that an audio device drains.

pub mod config;
pub mod core;
pub mod error;
pub mod messaging;

pub use crate::config::SynthConfig;
pub use crate::core::audio::{AudioClock, BlockRenderer, OutputDevice, Params, RenderThread, SampleSource};
pub use crate::core::scheduler::Scheduler;
pub use crate::core::score::Score;
pub use crate::core::synth::{Instrument, Mixer, NoteRegistry};
pub use crate::error::{Result, SynthError};
pub use crate::messaging::{MessageBus, SynthMessage};
