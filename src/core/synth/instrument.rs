use serde::{Serialize, Deserialize};
use crate::core::oscillator::{sample, Envelope, Lfo, Note, Waveform, DEFAULT_SAW_HARMONICS};

/// Twelfth root of two
pub const SEMITONE_RATIO: f64 = 1.059_463_094_359_295_3;
/// Frequency of scale index 0
pub const BASE_FREQUENCY: f64 = 8.0;

const VIBRATO: Lfo = Lfo::new(5.0, 0.001);

/// Equal-tempered frequency of a scale index (0 → 8 Hz)
pub fn frequency(scale_index: i32) -> f64 {
    BASE_FREQUENCY * SEMITONE_RATIO.powi(scale_index)
}

/// The fixed set of instruments. They carry no per-note state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instrument {
    Bell,
    BellSustain,
    Harmonica,
}

impl Instrument {
    pub fn envelope(&self) -> Envelope {
        match self {
            Instrument::Bell => Envelope::new(0.01, 1.0, 0.0, 1.0),
            Instrument::BellSustain => Envelope::new(0.01, 0.5, 0.8, 1.0),
            Instrument::Harmonica => Envelope::new(0.05, 1.0, 0.95, 0.1),
        }
    }

    /// Sound of `note` at `time`, plus whether its envelope has gone silent.
    pub fn render(&self, time: f64, note: &Note) -> (f64, bool) {
        let (amplitude, finished) = self.envelope().evaluate(time, note.on, note.off);
        let life = time - note.on;
        let id = note.id;
        let osc = |offset: i32, waveform: Waveform, lfo: Lfo| {
            sample(life, frequency(id + offset), waveform, lfo, DEFAULT_SAW_HARMONICS)
        };

        let sound = match self {
            Instrument::Bell => {
                1.00 * osc(12, Waveform::Sine, VIBRATO)
                    + 0.50 * osc(24, Waveform::Sine, Lfo::NONE)
                    + 0.25 * osc(36, Waveform::Sine, Lfo::NONE)
            },
            Instrument::BellSustain => {
                1.00 * osc(0, Waveform::Square, VIBRATO)
                    + 0.50 * osc(12, Waveform::Sine, Lfo::NONE)
                    + 0.25 * osc(24, Waveform::Sine, Lfo::NONE)
            },
            Instrument::Harmonica => {
                1.00 * osc(0, Waveform::Square, VIBRATO)
                    + 0.50 * osc(12, Waveform::Square, Lfo::NONE)
                    + 0.05 * osc(24, Waveform::Noise, Lfo::NONE)
            },
        };

        (amplitude * sound, finished)
    }
}
