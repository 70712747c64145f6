use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("not connected to a voice channel")]
    NotConnected,

    #[error("synthesis error: {0}")]
    Synthesis(String),

    #[error("synthesis request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
