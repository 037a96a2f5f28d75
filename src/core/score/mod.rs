//! Score file decoding
//!
//! Turns a standard MIDI file into per-track queues of timed note events.

mod parser;
mod reader;

pub use parser::{ChannelTrack, EventKind, MidiEvent, Score, HEADER_TAG, TRACK_TAG};
pub use reader::{encode_vlq, ByteReader, ParseError, MAX_VLQ_BYTES};
