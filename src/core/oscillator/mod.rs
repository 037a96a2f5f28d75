mod envelope;
mod filter;
mod note;
mod waveform;

// Sound generation primitives shared by every instrument
pub use self::envelope::Envelope;
pub use self::filter::LowPass;
pub use self::note::Note;
pub use self::waveform::{angular, sample, Lfo, Waveform, DEFAULT_SAW_HARMONICS};
