//! Live note input from hardware MIDI ports

mod input;

pub use input::{translate, MidiInputHandler};
