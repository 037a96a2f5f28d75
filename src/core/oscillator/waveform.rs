use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Harmonic count used by `SawAnalog` when no custom value is given
pub const DEFAULT_SAW_HARMONICS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    SawAnalog,
    SawDigital,
    Noise,
}

/// Frequency vibrato applied to an oscillator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lfo {
    pub frequency: f64,
    pub depth: f64,
}

impl Lfo {
    pub const NONE: Lfo = Lfo { frequency: 0.0, depth: 0.0 };

    pub const fn new(frequency: f64, depth: f64) -> Self {
        Self { frequency, depth }
    }
}

/// Converts a frequency in Hz to angular velocity
pub fn angular(hertz: f64) -> f64 {
    hertz * 2.0 * PI
}

/// Sample an oscillator at `time` seconds. Output lies in [-1, 1].
///
/// The phase is `2π·f·t + depth·f·sin(2π·lfo·t)`; every waveform except
/// `SawDigital` and `Noise` is a function of that phase alone.
/// `custom` is the harmonic bound for `SawAnalog` and ignored otherwise.
pub fn sample(time: f64, frequency: f64, waveform: Waveform, lfo: Lfo, custom: f64) -> f64 {
    let phase = angular(frequency) * time + lfo.depth * frequency * (angular(lfo.frequency) * time).sin();

    match waveform {
        Waveform::Sine => phase.sin(),
        Waveform::Square => {
            if phase.sin() > 0.0 { 1.0 } else { -1.0 }
        },
        Waveform::Triangle => phase.sin().asin() * (2.0 / PI),
        Waveform::SawAnalog => {
            let mut output = 0.0;
            let mut n = 1.0;
            while n < custom {
                output += (n * phase).sin() / n;
                n += 1.0;
            }
            output * (2.0 / PI)
        },
        Waveform::SawDigital => {
            if frequency <= 0.0 {
                return 0.0;
            }
            (2.0 / PI) * (frequency * PI * (time % (1.0 / frequency)) - (PI / 2.0))
        },
        Waveform::Noise => rand::random::<f64>() * 2.0 - 1.0,
    }
}
