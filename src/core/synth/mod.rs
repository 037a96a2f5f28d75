mod instrument;
mod mixer;
mod registry;

pub use instrument::{frequency, Instrument, BASE_FREQUENCY, SEMITONE_RATIO};
pub use mixer::{ChannelMap, Mixer, Voice, DEFAULT_MASTER_GAIN};
pub use registry::{NoteCommand, NoteRegistry, Transition};
