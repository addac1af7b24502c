//! Loading and size normalization of an image pair.
//!
//! Both sides are resized to the element-wise maximum of their dimensions so
//! the scorers always see equal-shaped rasters. When the aspect ratios differ
//! the stretch is lossy and pixel alignment is not guaranteed.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::{DiffError, DiffResult};

/// A raster ready for pixel-wise comparison, with its grayscale view.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    rgb: RgbImage,
    luma: GrayImage,
}

impl NormalizedImage {
    fn from_rgb(rgb: RgbImage) -> Self {
        let luma = imageops::grayscale(&rgb);
        Self { rgb, luma }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    pub fn into_rgb(self) -> RgbImage {
        self.rgb
    }
}

pub fn load_image(path: &Path) -> DiffResult<DynamicImage> {
    image::open(path).map_err(|source| DiffError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })
}

pub fn normalize_pair(
    old: &DynamicImage,
    new: &DynamicImage,
) -> DiffResult<(NormalizedImage, NormalizedImage)> {
    let (old_w, old_h) = (old.width(), old.height());
    let (new_w, new_h) = (new.width(), new.height());

    if old_w == 0 || old_h == 0 || new_w == 0 || new_h == 0 {
        return Err(DiffError::DimensionMismatch {
            old_width: old_w,
            old_height: old_h,
            new_width: new_w,
            new_height: new_h,
        });
    }

    let target = (old_w.max(new_w), old_h.max(new_h));
    Ok((
        NormalizedImage::from_rgb(resize_to(old, target)),
        NormalizedImage::from_rgb(resize_to(new, target)),
    ))
}

fn resize_to(img: &DynamicImage, (width, height): (u32, u32)) -> RgbImage {
    let rgb = img.to_rgb8();
    if rgb.dimensions() == (width, height) {
        return rgb;
    }
    imageops::resize(&rgb, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value; 3])))
    }

    #[test]
    fn test_equal_sizes_are_untouched() {
        let old = solid(40, 30, 200);
        let new = solid(40, 30, 10);
        let (a, b) = normalize_pair(&old, &new).unwrap();
        assert_eq!(a.dimensions(), (40, 30));
        assert_eq!(b.dimensions(), (40, 30));
        assert_eq!(a.clone().into_rgb(), old.to_rgb8());
    }

    #[test]
    fn test_target_is_elementwise_max() {
        let old = solid(100, 20, 255);
        let new = solid(60, 80, 255);
        let (a, b) = normalize_pair(&old, &new).unwrap();
        assert_eq!(a.dimensions(), (100, 80));
        assert_eq!(b.dimensions(), (100, 80));
        assert_eq!(a.luma().dimensions(), (100, 80));
    }

    #[test]
    fn test_zero_area_is_rejected() {
        let old = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        let new = solid(10, 10, 0);
        let err = normalize_pair(&old, &new).unwrap_err();
        assert!(matches!(err, DiffError::DimensionMismatch { old_width: 0, .. }));
    }

    #[test]
    fn test_missing_file_is_image_load_error() {
        let err = load_image(Path::new("/nonexistent/old.png")).unwrap_err();
        match err {
            DiffError::ImageLoad { path, .. } => assert!(path.ends_with("old.png")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_grayscale_view_matches_source() {
        let old = solid(4, 4, 128);
        let (a, _) = normalize_pair(&old, &old).unwrap();
        assert!(a.luma().pixels().all(|p| p[0] == 128));
    }
}
