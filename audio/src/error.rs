use thiserror::Error;

/// Errors returned by audio decoding and feature extraction.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("no decodable audio track")]
    NoAudioTrack,

    #[error("feature extraction produced no frames")]
    EmptyFeatures,

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(e: symphonia::core::errors::Error) -> Self {
        match e {
            symphonia::core::errors::Error::IoError(io) => AudioError::Io(io),
            other => AudioError::Decode(other.to_string()),
        }
    }
}
