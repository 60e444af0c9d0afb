//! File path → speaker label.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use speakerid_audio::{decode_file, AudioError, FeatureMatrix, Mfcc, MfccConfig, Waveform};
use tracing::{debug, warn};

use crate::error::PredictError;
use crate::labels::LabelEncoder;
use crate::model::{to_model_input, Classifier};

/// Line shown when an upload cannot be turned into a prediction.
pub const PROCESSING_ERROR_MESSAGE: &str = "Error: Could not process the audio file.";

/// Outcome of a prediction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// Top-1 speaker label.
    Speaker(String),
    /// Audio decoded but produced no features.
    ExtractionFailure,
    /// The file could not be decoded as audio.
    DecodeFailure(String),
}

impl Prediction {
    /// Returns the predicted label, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Prediction::Speaker(label) => Some(label),
            _ => None,
        }
    }

    /// Returns the user-visible result line. Failure causes are not revealed.
    pub fn message(&self) -> String {
        match self {
            Prediction::Speaker(label) => format!("Predicted Speaker: {label}"),
            Prediction::ExtractionFailure | Prediction::DecodeFailure(_) => {
                PROCESSING_ERROR_MESSAGE.to_string()
            }
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Returns the index of the highest score.
///
/// Ties resolve to the lowest index. NaN scores are ignored; `None` when
/// no comparable score exists.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

/// Turns audio into speaker labels.
///
/// Holds the classifier and label mapping injected at construction; both
/// are read-only afterwards, so one `Predictor` can serve concurrent
/// requests.
pub struct Predictor {
    classifier: Arc<dyn Classifier>,
    labels: LabelEncoder,
    mfcc: Mfcc,
}

impl Predictor {
    /// Creates a predictor from a loaded classifier and label mapping.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        labels: LabelEncoder,
        mfcc_cfg: MfccConfig,
    ) -> Result<Self, PredictError> {
        let mfcc = Mfcc::new(mfcc_cfg)?;
        if let Some(n) = classifier.num_classes() {
            if n != labels.len() {
                warn!(
                    "classifier has {} classes but label mapping has {}",
                    n,
                    labels.len()
                );
            }
        }
        Ok(Self {
            classifier,
            labels,
            mfcc,
        })
    }

    /// Returns the label mapping.
    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    /// Decodes the file at `path` and predicts its speaker.
    pub fn predict_file(&self, path: impl AsRef<Path>) -> Result<Prediction, PredictError> {
        let path = path.as_ref();
        let waveform = match decode_file(path) {
            Ok(wf) => wf,
            Err(e) => {
                warn!("decode {} failed: {e}", path.display());
                return Ok(Prediction::DecodeFailure(e.to_string()));
            }
        };
        self.predict_waveform(&waveform)
    }

    /// Predicts the speaker of an already decoded waveform.
    pub fn predict_waveform(&self, waveform: &Waveform) -> Result<Prediction, PredictError> {
        let features = match self.mfcc.extract(waveform) {
            Ok(f) => f,
            Err(AudioError::EmptyFeatures) => {
                warn!(
                    "no features from {} samples @ {} Hz",
                    waveform.len(),
                    waveform.sample_rate
                );
                return Ok(Prediction::ExtractionFailure);
            }
            Err(e) => return Err(e.into()),
        };
        let label = self.predict_features(&features)?;
        Ok(Prediction::Speaker(label))
    }

    /// Classifies a fixed-shape feature matrix and decodes the top-1 label.
    pub fn predict_features(&self, features: &FeatureMatrix) -> Result<String, PredictError> {
        let input = to_model_input(features)?;
        let scores = self.classifier.classify(&input)?;
        let index = argmax(&scores).ok_or(PredictError::EmptyScores)?;
        let label = self.labels.decode(index)?;
        debug!("top-1 class {index} ({label}), score {}", scores[index]);
        Ok(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_unique_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
    }

    #[test]
    fn argmax_ties_pick_first() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4, 0.0]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.9]), Some(2));
        assert_eq!(argmax(&[f32::NAN, f32::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn argmax_negative_scores() {
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
    }

    #[test]
    fn prediction_messages() {
        assert_eq!(
            Prediction::Speaker("alice".into()).message(),
            "Predicted Speaker: alice"
        );
        assert_eq!(
            Prediction::ExtractionFailure.message(),
            "Error: Could not process the audio file."
        );
        assert_eq!(
            Prediction::DecodeFailure("bad header".into()).to_string(),
            PROCESSING_ERROR_MESSAGE
        );
        assert_eq!(Prediction::Speaker("bob".into()).label(), Some("bob"));
        assert_eq!(Prediction::ExtractionFailure.label(), None);
    }
}
