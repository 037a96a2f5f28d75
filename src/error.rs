use thiserror::Error;

/// Errors surfaced by the synthesizer library
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No output device available")]
    NoOutputDevice,

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("MIDI input error: {0}")]
    Midi(String),

    #[error("WAV write error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, SynthError>;
