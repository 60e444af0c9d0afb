use speakerid_audio::AudioError;
use thiserror::Error;

/// Errors returned by prediction operations.
///
/// Decode and extraction failures are not errors: they are reported as
/// [`Prediction`](crate::Prediction) variants so callers can always render
/// a result.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid label mapping: {0}")]
    Labels(String),

    #[error("class index {index} out of range for {len} labels")]
    LabelOutOfRange { index: usize, len: usize },

    #[error("model error: {0}")]
    Model(String),

    #[error("classifier returned no usable scores")]
    EmptyScores,

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("audio: {0}")]
    Audio(#[from] AudioError),
}
