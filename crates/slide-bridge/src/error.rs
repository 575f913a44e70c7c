use slide_core::SlideError;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// A save that could not be committed.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid frame: {0}")]
    Frame(#[from] serde_json::Error),
    #[error(transparent)]
    Slide(#[from] SlideError),
    #[error("target `{0}` is not a relative path inside the content root")]
    InvalidTarget(String),
    #[error("writer closed its output without responding")]
    NoResponse,
    #[error("writer exited with {0}")]
    WriterExit(ExitStatus),
    #[error("writer did not answer within {0:?}")]
    Timeout(Duration),
    #[error("writer reported: {0}")]
    Writer(String),
    #[error("the bridge worker has shut down")]
    Closed,
    #[error("invalid bridge config: {0}")]
    Config(#[from] toml::de::Error),
}
