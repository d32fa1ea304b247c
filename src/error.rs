// Engine errors - shared by the facade, the audio backends and the config loader

use thiserror::Error;

/// Errors surfaced by the engine control interface
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Audio engine not initialized: call initialize() with an output first")]
    NotInitialized,

    #[error("Audio engine has been disposed")]
    Disposed,

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Microphone error: {0}")]
    Microphone(String),

    #[error("Render command queue is full")]
    CommandQueueFull,

    #[error("All {0} tone voices are in use")]
    VoiceLimit(usize),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
