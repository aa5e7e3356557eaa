use thiserror::Error;

/// All errors produced by splistener-core.
#[derive(Debug, Error)]
pub enum ListenError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    /// Mid-session read failure. Fatal: the session stops and must be
    /// re-created to recover.
    #[error("audio read error: {0}")]
    AudioRead(String),

    /// Per-cycle decode failure. Recoverable: capture continues and the next
    /// cadence tick retries.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("model file not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },

    #[error("a recognition session is already active")]
    AlreadyInitialized,

    #[error("session has not been initialized")]
    NotInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ListenError>;
