//! ONNX Runtime implementation of [`CellModel`].
//!
//! The SubCell network is exported as two graphs: the ViT encoder maps a
//! normalized `[1, C, H, W]` crop to a pooled embedding, and the classifier
//! head maps that embedding to class logits.

use super::{CellModel, ModelConfig, OrtInfer, Prediction, save_prediction};
use crate::core::{SubCellError, SubCellResult};
use crate::processors::MinMaxNormalize;
use ndarray::{Array2, Array4};
use std::path::Path;
use tracing::debug;

/// Encoder and classifier sessions plus the preprocessing they expect.
#[derive(Debug)]
pub struct OrtCellModel {
    encoder: OrtInfer,
    classifier: OrtInfer,
    normalizer: MinMaxNormalize,
    softmax: bool,
}

impl OrtCellModel {
    /// Loads both graphs described by a model directory.
    pub fn load(
        config: &ModelConfig,
        encoder_path: &Path,
        classifier_path: &Path,
    ) -> SubCellResult<Self> {
        let encoder = OrtInfer::new(
            "encoder",
            encoder_path,
            config.encoder_input.as_deref(),
            config.intra_threads,
        )?;
        let classifier = OrtInfer::new(
            "classifier",
            classifier_path,
            config.classifier_input.as_deref(),
            config.intra_threads,
        )?;
        debug!(?encoder, ?classifier, "model sessions ready");

        Ok(Self {
            encoder,
            classifier,
            normalizer: MinMaxNormalize::default(),
            softmax: config.softmax,
        })
    }

    fn embed(&mut self, batch: &Array4<f32>) -> SubCellResult<Vec<f32>> {
        let (shape, data) = self.encoder.infer_4d(batch)?;
        single_row("encoder", &shape, data)
    }

    fn classify(&mut self, embedding: &[f32]) -> SubCellResult<Vec<f32>> {
        let input = Array2::from_shape_vec((1, embedding.len()), embedding.to_vec())?;
        let (shape, data) = self.classifier.infer_2d(&input)?;
        let logits = single_row("classifier", &shape, data)?;
        Ok(if self.softmax { softmax(&logits) } else { logits })
    }
}

impl CellModel for OrtCellModel {
    fn run(&mut self, channels: &[Array2<f32>], output_stem: &Path) -> SubCellResult<Prediction> {
        let batch = self.normalizer.stack(channels)?;
        let embedding = self.embed(&batch)?;
        let probabilities = self.classify(&embedding)?;
        let prediction = Prediction {
            embedding,
            probabilities,
        };
        save_prediction(output_stem, &prediction)?;
        Ok(prediction)
    }
}

/// Accepts `[D]` or `[1, D]` outputs and returns the `D` values.
fn single_row(model: &str, shape: &[i64], data: Vec<f32>) -> SubCellResult<Vec<f32>> {
    match shape {
        [_] | [1, _] => Ok(data),
        _ => Err(SubCellError::invalid_input(format!(
            "{} output has shape {:?}, expected [D] or [1, D]",
            model, shape
        ))),
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return exps;
    }
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_single_row_shapes() {
        assert_eq!(single_row("m", &[3], vec![1.0, 2.0, 3.0]).unwrap().len(), 3);
        assert_eq!(single_row("m", &[1, 2], vec![1.0, 2.0]).unwrap().len(), 2);
        assert!(single_row("m", &[2, 2], vec![0.0; 4]).is_err());
    }

    #[test]
    fn test_load_fails_for_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let result = OrtCellModel::load(
            &ModelConfig::default(),
            &dir.path().join("encoder.pth"),
            &dir.path().join("classifier.pth"),
        );
        assert!(result.is_err());
    }
}
