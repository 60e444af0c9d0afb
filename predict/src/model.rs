use ndarray::Array4;
use speakerid_audio::FeatureMatrix;

use crate::PredictError;

/// Classifier input, `[batch=1, n_mfcc, frames, channel=1]`.
pub type FeatureTensor = Array4<f32>;

/// Produces per-class scores from a feature tensor.
///
/// Implementations are loaded once and shared between requests, so they
/// must be safe for concurrent use.
pub trait Classifier: Send + Sync {
    /// Runs inference and returns one score per known class.
    fn classify(&self, input: &FeatureTensor) -> Result<Vec<f32>, PredictError>;

    /// Returns the number of output classes, if known.
    fn num_classes(&self) -> Option<usize> {
        None
    }
}

/// Reshapes a `[rows, cols]` feature matrix into `[1, rows, cols, 1]`.
pub fn to_model_input(features: &FeatureMatrix) -> Result<FeatureTensor, PredictError> {
    let (rows, cols) = features.dim();
    let data: Vec<f32> = features.iter().copied().collect();
    Array4::from_shape_vec((1, rows, cols, 1), data)
        .map_err(|e| PredictError::ShapeMismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn reshape_keeps_row_major_order() {
        let m = Array2::from_shape_fn((13, 100), |(r, c)| (r * 1000 + c) as f32);
        let t = to_model_input(&m).unwrap();
        assert_eq!(t.dim(), (1, 13, 100, 1));
        assert_eq!(t[[0, 0, 0, 0]], 0.0);
        assert_eq!(t[[0, 2, 7, 0]], 2007.0);
        assert_eq!(t[[0, 12, 99, 0]], 12099.0);
    }

    #[test]
    fn reshape_handles_transposed_views() {
        let m = Array2::from_shape_fn((100, 13), |(r, c)| (c * 1000 + r) as f32);
        let transposed = m.t().to_owned();
        let t = to_model_input(&transposed).unwrap();
        assert_eq!(t[[0, 3, 42, 0]], 3042.0);
    }
}
