pub mod audio;
pub mod midi;
pub mod oscillator;
pub mod scheduler;
pub mod score;
pub mod synth;
