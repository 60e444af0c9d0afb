//! [`Classifier`] implementation using ONNX Runtime.

use std::path::Path;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::PredictError;
use crate::model::{Classifier, FeatureTensor};

/// Configuration for [`OnnxClassifier`].
#[derive(Debug, Clone)]
pub struct OnnxClassifierConfig {
    /// Input name; `None` feeds the first model input.
    pub input_name: Option<String>,
    /// Output name; `None` reads the first model output.
    pub output_name: Option<String>,
    /// Enable ONNX Runtime graph optimizations (default: true).
    pub graph_optimization: bool,
    /// Intra-op thread count, 0 = runtime default.
    pub intra_threads: usize,
    /// Input shape used for the warm-up run that discovers the class count.
    pub input_shape: [usize; 4],
}

impl Default for OnnxClassifierConfig {
    fn default() -> Self {
        Self {
            input_name: None,
            output_name: None,
            graph_optimization: true,
            intra_threads: 0,
            input_shape: [1, 13, 100, 1],
        }
    }
}

/// Speaker classifier backed by an ONNX export of the trained CNN.
///
/// # Thread Safety
///
/// `ort::Session::run` needs exclusive access, so runs are serialized
/// behind a mutex. The session is loaded once and shared.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: Option<String>,
    output_name: Option<String>,
    num_classes: usize,
}

impl OnnxClassifier {
    /// Loads a model file and runs one zero-input pass to learn the
    /// number of output classes.
    pub fn load(path: impl AsRef<Path>, cfg: OnnxClassifierConfig) -> Result<Self, PredictError> {
        let path = path.as_ref();
        let level = if cfg.graph_optimization {
            GraphOptimizationLevel::Level3
        } else {
            GraphOptimizationLevel::Disable
        };

        let mut builder = Session::builder()
            .map_err(model_err)?
            .with_optimization_level(level)
            .map_err(model_err)?;
        if cfg.intra_threads > 0 {
            builder = builder
                .with_intra_threads(cfg.intra_threads)
                .map_err(model_err)?;
        }
        let session = builder.commit_from_file(path).map_err(|e| {
            PredictError::Model(format!("load {}: {e}", path.display()))
        })?;

        let mut classifier = Self {
            session: Mutex::new(session),
            input_name: cfg.input_name,
            output_name: cfg.output_name,
            num_classes: 0,
        };

        let probe = FeatureTensor::zeros(cfg.input_shape);
        classifier.num_classes = classifier.classify(&probe)?.len();
        if classifier.num_classes == 0 {
            return Err(PredictError::EmptyScores);
        }

        info!(
            "loaded classifier {} ({} classes, graph optimization {})",
            path.display(),
            classifier.num_classes,
            if cfg.graph_optimization { "on" } else { "off" }
        );
        Ok(classifier)
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, input: &FeatureTensor) -> Result<Vec<f32>, PredictError> {
        let tensor = Tensor::from_array(input.clone()).map_err(model_err)?;

        let mut session = self.session.lock();
        let outputs = match &self.input_name {
            Some(name) => session.run(ort::inputs![name.as_str() => tensor]),
            None => session.run(ort::inputs![tensor]),
        }
        .map_err(model_err)?;

        let value = match &self.output_name {
            Some(name) => outputs
                .get(name.as_str())
                .ok_or_else(|| PredictError::Model(format!("no output named {name:?}")))?,
            None => &outputs[0],
        };
        let (_shape, scores) = value.try_extract_tensor::<f32>().map_err(model_err)?;

        debug!("classifier produced {} scores", scores.len());
        Ok(scores.to_vec())
    }

    fn num_classes(&self) -> Option<usize> {
        Some(self.num_classes)
    }
}

fn model_err(e: impl std::fmt::Display) -> PredictError {
    PredictError::Model(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = OnnxClassifierConfig::default();
        assert_eq!(cfg.input_shape, [1, 13, 100, 1]);
        assert!(cfg.graph_optimization);
        assert!(cfg.input_name.is_none());
        assert!(cfg.output_name.is_none());
    }

    #[test]
    fn load_missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = OnnxClassifier::load(
            dir.path().join("missing.onnx"),
            OnnxClassifierConfig::default(),
        );
        assert!(matches!(result, Err(PredictError::Model(_))));
    }

    #[test]
    fn load_corrupt_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.onnx");
        std::fs::write(&path, b"not a protobuf").unwrap();
        let result = OnnxClassifier::load(
            &path,
            OnnxClassifierConfig {
                graph_optimization: false,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(PredictError::Model(_))));
    }
}
