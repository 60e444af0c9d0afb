//! Audio decoding and MFCC feature extraction.
//!
//! This crate provides the front half of the speaker identification
//! pipeline:
//!
//! - `decode`: audio file → mono [`Waveform`] at its native sample rate
//! - `mfcc`: [`Waveform`] → fixed-shape `[13, 100]` [`FeatureMatrix`]
//!
//! # Example
//!
//! ```no_run
//! use speakerid_audio::{decode_file, extract_features, MfccConfig};
//!
//! let waveform = decode_file("uploads/clip.wav").unwrap();
//! let features = extract_features(&waveform, &MfccConfig::default()).unwrap();
//! assert_eq!(features.dim(), (13, 100));
//! ```

pub mod decode;
mod error;
pub mod mfcc;

pub use decode::{decode_bytes, decode_file, Waveform};
pub use error::AudioError;
pub use mfcc::{extract_features, pad_or_truncate, FeatureMatrix, Mfcc, MfccConfig};
