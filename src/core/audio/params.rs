use std::sync::atomic::{AtomicU64, Ordering};

/// A live-tunable scalar shared across threads without locking
#[derive(Debug)]
pub struct Knob {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    value: AtomicU64,
}

impl Knob {
    pub fn new(min: f64, max: f64, step: f64, value: f64) -> Self {
        Self {
            min,
            max,
            step,
            value: AtomicU64::new(value.clamp(min, max).to_bits()),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Store `value` clamped to the knob range and return what was stored.
    pub fn set(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        self.value.store(clamped.to_bits(), Ordering::Relaxed);
        clamped
    }

    pub fn increment(&self) -> f64 {
        self.nudge(self.step)
    }

    pub fn decrement(&self) -> f64 {
        self.nudge(-self.step)
    }

    fn nudge(&self, delta: f64) -> f64 {
        let mut current = self.value.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).clamp(self.min, self.max);
            match self.value.compare_exchange_weak(current, next.to_bits(), Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

/// The knobs the render thread reads every block
#[derive(Debug)]
pub struct Params {
    /// Low-pass cutoff in Hz
    pub cutoff: Knob,
    /// Output volume applied after the mixer
    pub volume: Knob,
}

impl Params {
    pub fn new(cutoff: f64, volume: f64) -> Self {
        Self {
            cutoff: Knob::new(0.0, 20000.0, 1.0, cutoff),
            volume: Knob::new(0.0, 1.0, 0.01, volume),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new(10000.0, 1.0)
    }
}
