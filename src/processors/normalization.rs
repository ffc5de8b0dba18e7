//! Channel normalization and stacking for the SubCell encoder.
//!
//! The encoder expects a `[1, C, H, W]` tensor in which every channel has been
//! min-max scaled independently. Stains differ by orders of magnitude in
//! intensity, so a shared scale would drown the weaker channels.

use crate::core::{SubCellError, SubCellResult};
use ndarray::{Array2, Array4, s};

/// Min-max normalization applied per channel.
#[derive(Debug, Clone)]
pub struct MinMaxNormalize {
    /// Added to the denominator so flat channels do not divide by zero.
    pub epsilon: f32,
}

impl Default for MinMaxNormalize {
    fn default() -> Self {
        Self { epsilon: 1e-6 }
    }
}

impl MinMaxNormalize {
    /// Creates a normalizer with the given epsilon.
    ///
    /// # Errors
    ///
    /// Returns an error if `epsilon` is negative or not finite.
    pub fn new(epsilon: f32) -> SubCellResult<Self> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(SubCellError::config_error(format!(
                "epsilon must be a finite non-negative number, got {epsilon}"
            )));
        }
        Ok(Self { epsilon })
    }

    /// Scales a single plane to `[0, 1]`. A constant plane becomes all zeros.
    pub fn normalize(&self, plane: &Array2<f32>) -> Array2<f32> {
        let (min, max) = plane
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() || !max.is_finite() {
            return Array2::zeros(plane.raw_dim());
        }
        let range = max - min + self.epsilon;
        if range <= 0.0 {
            return Array2::zeros(plane.raw_dim());
        }
        plane.mapv(|v| (v - min) / range)
    }

    /// Normalizes each channel and stacks them into a `[1, C, H, W]` batch.
    ///
    /// # Errors
    ///
    /// Returns an error if no channels are given or if the channels do not
    /// share the same height and width.
    pub fn stack(&self, channels: &[Array2<f32>]) -> SubCellResult<Array4<f32>> {
        let first = channels
            .first()
            .ok_or_else(|| SubCellError::invalid_input("no channel images to stack"))?;
        let (height, width) = first.dim();

        for (idx, channel) in channels.iter().enumerate() {
            if channel.dim() != (height, width) {
                return Err(SubCellError::invalid_input(format!(
                    "channel {} has shape {:?}, expected {:?} like the first channel",
                    idx,
                    channel.dim(),
                    (height, width)
                )));
            }
        }

        let mut batch = Array4::<f32>::zeros((1, channels.len(), height, width));
        for (idx, channel) in channels.iter().enumerate() {
            batch
                .slice_mut(s![0, idx, .., ..])
                .assign(&self.normalize(channel));
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalize_scales_to_unit_range() {
        let norm = MinMaxNormalize::new(0.0).unwrap();
        let plane = array![[2.0, 4.0], [6.0, 10.0]];
        let out = norm.normalize(&plane);
        assert_eq!(out, array![[0.0, 0.25], [0.5, 1.0]]);
    }

    #[test]
    fn test_constant_plane_becomes_zero() {
        let norm = MinMaxNormalize::default();
        let out = norm.normalize(&Array2::from_elem((3, 3), 0.7));
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_stack_keeps_channel_order() {
        let norm = MinMaxNormalize::new(0.0).unwrap();
        let red = array![[0.0, 1.0]];
        let blue = array![[1.0, 0.0]];
        let batch = norm.stack(&[red, blue]).unwrap();
        assert_eq!(batch.shape(), &[1, 2, 1, 2]);
        assert_eq!(batch[[0, 0, 0, 1]], 1.0);
        assert_eq!(batch[[0, 1, 0, 0]], 1.0);
    }

    #[test]
    fn test_stack_rejects_mismatched_shapes() {
        let norm = MinMaxNormalize::default();
        let result = norm.stack(&[Array2::zeros((4, 4)), Array2::zeros((4, 5))]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stack_rejects_empty_input() {
        assert!(MinMaxNormalize::default().stack(&[]).is_err());
    }

    #[test]
    fn test_negative_epsilon_is_rejected() {
        assert!(MinMaxNormalize::new(-1.0).is_err());
    }
}
