//! Speaker prediction from audio files.
//!
//! # Architecture
//!
//! The pipeline processes one file in four stages:
//!
//! 1. [`speakerid_audio::decode_file`]: audio file -> mono waveform
//! 2. [`speakerid_audio::Mfcc::extract`]: waveform -> `[13, 100]` MFCC matrix
//! 3. [`Classifier::classify`]: `[1, 13, 100, 1]` tensor -> class scores
//! 4. [`argmax`] + [`LabelEncoder::decode`]: scores -> speaker label
//!
//! [`Predictor`] wires the stages together around a classifier and label
//! mapping passed in by the caller.
//!
//! # Backends
//!
//! With the default `onnx` feature, [`OnnxClassifier`] runs an ONNX export of
//! the trained CNN through ONNX Runtime.

mod error;
mod labels;
mod model;
#[cfg(feature = "onnx")]
mod model_onnx;
mod predictor;

pub use error::PredictError;
pub use labels::LabelEncoder;
pub use model::{to_model_input, Classifier, FeatureTensor};
#[cfg(feature = "onnx")]
pub use model_onnx::{OnnxClassifier, OnnxClassifierConfig};
pub use predictor::{argmax, Prediction, Predictor, PROCESSING_ERROR_MESSAGE};
