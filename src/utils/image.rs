//! Utility functions for loading channel images.
//!
//! Microscopy exports come as 8-bit or 16-bit grayscale PNG/TIFF files, and
//! occasionally as RGB renderings of a single stain. Every variant is reduced
//! to one luminance plane scaled to `[0, 1]`.

use crate::core::{SubCellError, SubCellResult};
use image::{DynamicImage, ImageError, ImageReader};
use ndarray::Array2;
use std::path::Path;
use tracing::warn;

/// Converts a DynamicImage to a single luminance plane with values in `[0, 1]`.
///
/// The returned array is indexed `[row, column]`.
pub fn dynamic_to_gray_array(img: &DynamicImage) -> SubCellResult<Array2<f32>> {
    let gray = img.to_luma32f();
    let (width, height) = gray.dimensions();
    let plane = Array2::from_shape_vec((height as usize, width as usize), gray.into_raw())?;
    Ok(plane)
}

/// Loads one channel image as a grayscale plane.
///
/// The format is taken from the file extension first. When that decoder
/// rejects the bytes, the format is sniffed from the content instead.
///
/// # Errors
///
/// Returns [`SubCellError::ImageLoad`] if the file cannot be opened or decoded.
pub fn load_gray_channel(path: &Path) -> SubCellResult<Array2<f32>> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(ImageError::Decoding(_) | ImageError::Unsupported(_)) => {
            warn!(
                "- {} does not decode as its extension says, sniffing the format.",
                path.display()
            );
            ImageReader::open(path)
                .and_then(|reader| reader.with_guessed_format())
                .map_err(|e| SubCellError::io("open image", path, e))?
                .decode()
                .map_err(|e| SubCellError::image_load(path, e))?
        }
        Err(e) => return Err(SubCellError::image_load(path, e)),
    };
    dynamic_to_gray_array(&img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_load_gray_channel_scales_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        let mut img = GrayImage::new(3, 2);
        img.put_pixel(2, 1, Luma([255]));
        img.save(&path).unwrap();

        let plane = load_gray_channel(&path).unwrap();
        assert_eq!(plane.dim(), (2, 3));
        assert_eq!(plane[[0, 0]], 0.0);
        assert!((plane[[1, 2]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rgb_image_is_reduced_to_one_plane() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("green.png");
        let img = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        img.save(&path).unwrap();

        let plane = load_gray_channel(&path).unwrap();
        assert_eq!(plane.dim(), (4, 4));
        assert!(plane.iter().all(|&v| (v - 1.0).abs() < 1e-3));
    }

    #[test]
    fn test_mismatched_extension_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let png_path = dir.path().join("blue.png");
        GrayImage::from_pixel(2, 2, Luma([128])).save(&png_path).unwrap();
        let tiff_named = dir.path().join("blue.tif");
        std::fs::copy(&png_path, &tiff_named).unwrap();

        let plane = load_gray_channel(&tiff_named).unwrap();
        assert_eq!(plane.dim(), (2, 2));
    }

    #[test]
    fn test_undecodable_content_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yellow.png");
        std::fs::write(&path, b"not an image at all").unwrap();

        let err = load_gray_channel(&path).unwrap_err();
        assert!(matches!(err, SubCellError::ImageLoad { .. }), "{err}");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_gray_channel(Path::new("does/not/exist.png")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.png"));
    }
}
