//! The two similarity signals: an average-hash distance over the whole image
//! and a windowed structural similarity with its per-pixel map.

use image::{GrayImage, Luma};
use image_compare::{Algorithm, SimilarityImage};
use image_hasher::{HashAlg, HasherConfig, ImageHash};

use crate::error::{DiffError, DiffResult};
use crate::normalize::NormalizedImage;

/// Side of the average-hash grid. The fingerprint has `HASH_SIZE²` bits.
pub const HASH_SIZE: u32 = 8;

/// Average hash: shrink to an 8x8 grid, one bit per cell against the mean.
pub fn average_hash(luma: &GrayImage) -> ImageHash {
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Mean)
        .hash_size(HASH_SIZE, HASH_SIZE)
        .to_hasher();
    hasher.hash_image(luma)
}

/// Hamming distance divided by the square of the grid side, so 0 means
/// identical fingerprints and 1 means every cell flipped.
pub fn hash_distance(a: &ImageHash, b: &ImageHash) -> f64 {
    f64::from(a.dist(b)) / f64::from(HASH_SIZE * HASH_SIZE)
}

/// Per-pixel SSIM values, row major, same shape as the compared images.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMap {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

impl SimilarityMap {
    fn from_gray(map: &image::ImageBuffer<Luma<f32>, Vec<f32>>) -> Self {
        Self {
            width: map.width(),
            height: map.height(),
            values: map.pixels().map(|p| f64::from(p[0])).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.values[(y * self.width + x) as usize]
    }

    /// Similarity clamped to [0, 1] and scaled to 0..=255.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let v = self.get(x, y).clamp(0.0, 1.0);
            Luma([(v * 255.0).round() as u8])
        })
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityResult {
    pub hash_distance: f64,
    pub structural_score: f64,
    pub similarity_map: SimilarityMap,
}

/// Windowed SSIM (8x8 tiles) over two equal-sized grayscale rasters.
/// Returns the mean score and the map, each pixel carrying its tile's score.
pub fn structural_similarity(a: &GrayImage, b: &GrayImage) -> DiffResult<(f64, SimilarityMap)> {
    let result = image_compare::gray_similarity_structure(&Algorithm::MSSIMSimple, a, b)
        .map_err(|e| DiffError::Compare(e.to_string()))?;

    match result.image {
        SimilarityImage::Gray(map) => Ok((result.score, SimilarityMap::from_gray(&map))),
        _ => Err(DiffError::Compare(
            "structural comparison returned a color map".to_string(),
        )),
    }
}

/// Runs both scorers side by side on a normalized pair.
pub fn score_pair(old: &NormalizedImage, new: &NormalizedImage) -> DiffResult<SimilarityResult> {
    let (hash_distance, structural) = rayon::join(
        || hash_distance(&average_hash(old.luma()), &average_hash(new.luma())),
        || structural_similarity(old.luma(), new.luma()),
    );
    let (structural_score, similarity_map) = structural?;
    Ok(SimilarityResult {
        hash_distance,
        structural_score,
        similarity_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    const EPS: f64 = 1e-6;

    fn gradient(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]))
    }

    fn with_block(base: &GrayImage, x0: u32, y0: u32, bw: u32, bh: u32, value: u8) -> GrayImage {
        let mut out = base.clone();
        for y in y0..y0 + bh {
            for x in x0..x0 + bw {
                out.put_pixel(x, y, Luma([value]));
            }
        }
        out
    }

    #[test]
    fn test_identical_images_score_one() {
        let img = gradient(64, 48);
        let (score, map) = structural_similarity(&img, &img).unwrap();
        assert!((score - 1.0).abs() < EPS);
        assert!(map.to_luma().pixels().all(|p| p[0] == 255));
        assert_eq!(hash_distance(&average_hash(&img), &average_hash(&img)), 0.0);
    }

    #[test]
    fn test_ssim_is_symmetric() {
        let a = gradient(50, 40);
        let b = with_block(&a, 10, 10, 20, 8, 0);
        let (ab, _) = structural_similarity(&a, &b).unwrap();
        let (ba, _) = structural_similarity(&b, &a).unwrap();
        assert!((ab - ba).abs() < EPS);
        assert!(ab < 1.0);
    }

    #[test]
    fn test_map_is_low_only_near_the_change() {
        let a = GrayImage::from_pixel(64, 64, Luma([255]));
        let b = with_block(&a, 24, 24, 8, 8, 0);
        let (_, map) = structural_similarity(&a, &b).unwrap();
        assert_eq!(map.width(), 64);
        assert_eq!(map.height(), 64);
        assert!((map.get(0, 0) - 1.0).abs() < EPS);
        assert!((map.get(63, 63) - 1.0).abs() < EPS);
        assert!(map.get(27, 27) < 0.5);
        assert!((map.get(8, 27) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        let a = GrayImage::new(10, 10);
        let b = GrayImage::new(12, 10);
        assert!(matches!(
            structural_similarity(&a, &b),
            Err(DiffError::Compare(_))
        ));
    }

    #[test]
    fn test_hash_distance_range() {
        let dark = GrayImage::from_fn(32, 32, |x, _| Luma([if x < 16 { 0 } else { 255 }]));
        let flipped = GrayImage::from_fn(32, 32, |x, _| Luma([if x < 16 { 255 } else { 0 }]));
        let d = hash_distance(&average_hash(&dark), &average_hash(&flipped));
        assert!(d > 0.9 && d <= 1.0);
    }

    #[test]
    fn test_hash_ignores_brightness_shift_of_flat_image() {
        let a = GrayImage::from_pixel(20, 20, Luma([90]));
        let b = GrayImage::from_pixel(20, 20, Luma([200]));
        assert_eq!(hash_distance(&average_hash(&a), &average_hash(&b)), 0.0);
    }

    #[test]
    fn test_score_pair_runs_both_scorers() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_fn(30, 30, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 8) as u8, 100])
        }));
        let (a, b) = crate::normalize::normalize_pair(&rgb, &rgb).unwrap();
        let result = score_pair(&a, &b).unwrap();
        assert_eq!(result.hash_distance, 0.0);
        assert!((result.structural_score - 1.0).abs() < EPS);
        assert_eq!(result.similarity_map.width(), 30);
    }
}
