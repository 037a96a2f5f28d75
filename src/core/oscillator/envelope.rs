use serde::{Serialize, Deserialize};

/// ADSR envelope parameters. Fixed per instrument, never per note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub start: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.1,
            decay: 0.1,
            sustain: 1.0,
            release: 0.2,
            start: 1.0,
        }
    }
}

impl Envelope {
    pub const fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            start: 1.0,
        }
    }

    /// Attack/decay/sustain level `life` seconds after the note was struck.
    fn held_level(&self, life: f64) -> f64 {
        if life <= self.attack {
            (life / self.attack) * self.start
        } else if life <= self.attack + self.decay {
            ((life - self.attack) / self.decay) * (self.sustain - self.start) + self.start
        } else {
            self.sustain
        }
    }

    /// Amplitude in [0, 1] at `time` for a note struck at `on` and released at `off`.
    ///
    /// Computed from scratch on every call. A note is held while `on > off`;
    /// once released, the release ramp starts from the level the held curve
    /// had reached at `off`.
    pub fn amplitude(&self, time: f64, on: f64, off: f64) -> f64 {
        let amplitude = if on > off {
            self.held_level(time - on)
        } else {
            let release_level = self.held_level(off - on);
            ((time - off) / self.release) * (0.0 - release_level) + release_level
        };

        if amplitude <= 0.0 {
            0.0
        } else {
            amplitude
        }
    }

    /// Amplitude plus the finished flag (amplitude has reached zero).
    pub fn evaluate(&self, time: f64, on: f64, off: f64) -> (f64, bool) {
        let amplitude = self.amplitude(time, on, off);
        (amplitude, amplitude <= 0.0)
    }
}
