use std::f64::consts::PI;

/// One-pole low-pass filter applied to the mixed output
#[derive(Debug, Clone)]
pub struct LowPass {
    sample_rate: f64,
    cutoff: f64,
    alpha: f64,
    previous: f64,
}

impl LowPass {
    pub fn new(sample_rate: f64, cutoff: f64) -> Self {
        let mut filter = Self {
            sample_rate,
            cutoff: f64::NAN,
            alpha: 0.0,
            previous: 0.0,
        };
        filter.set_cutoff(cutoff);
        filter
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Recomputes the coefficient only when the cutoff actually changes.
    pub fn set_cutoff(&mut self, cutoff: f64) {
        if cutoff == self.cutoff {
            return;
        }
        self.cutoff = cutoff;
        self.alpha = (-2.0 * PI * cutoff / self.sample_rate).exp();
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = (1.0 - self.alpha) * input + self.alpha * self.previous;
        self.previous = output;
        output
    }

    pub fn reset(&mut self) {
        self.previous = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn settles_on_dc_input() {
        let mut lp = LowPass::new(44100.0, 120.0);
        let mut out = 0.0;
        for _ in 0..44100 {
            out = lp.process(1.0);
        }
        assert_abs_diff_eq!(out, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn attenuates_nyquist_tone() {
        let mut lp = LowPass::new(44100.0, 200.0);
        let mut peak: f64 = 0.0;
        for i in 0..4410 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let y = lp.process(x);
            if i > 1000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.05, "peak {peak}");
    }

    #[test]
    fn zero_cutoff_holds_previous_output() {
        let mut lp = LowPass::new(44100.0, 0.0);
        assert_eq!(lp.process(1.0), 0.0);
        lp.set_cutoff(1000.0);
        assert!(lp.process(1.0) > 0.0);
        lp.reset();
        assert_eq!(lp.cutoff(), 1000.0);
    }
}
