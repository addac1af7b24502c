pub mod annotate;
pub mod artifact;
pub mod batch;
pub mod config;
pub mod decision;
pub mod error;
pub mod narration;
pub mod normalize;
pub mod region;
pub mod similarity;
pub mod utils;
pub mod verdict;

pub use artifact::ArtifactWriter;
pub use batch::{match_pairs, BatchRunner, BatchSummary, CancelFlag, PairFailure, PairListing};
pub use config::{ArtifactMode, DiffConfig, Thresholds};
pub use error::{DiffError, DiffResult, NarrationError};
pub use narration::{NarrationProvider, NarrationRequest};
pub use region::{DiffRegion, RegionKind};
pub use verdict::{ComparisonVerdict, ImagePair, PairAnalysis};

use image::DynamicImage;
use tracing::debug;

use decision::is_changed;
use normalize::{load_image, normalize_pair};
use region::extract_regions;
use similarity::score_pair;

/// Loads both files of a pair and runs the full comparison on them.
pub fn analyze_pair(pair: &ImagePair, thresholds: &Thresholds) -> DiffResult<PairAnalysis> {
    let old = load_image(&pair.old_path)?;
    let new = load_image(&pair.new_path)?;
    analyze_images(&pair.filename, &old, &new, thresholds)
}

/// Normalize, score, decide, and localize changes when there are any.
pub fn analyze_images(
    filename: &str,
    old: &DynamicImage,
    new: &DynamicImage,
    thresholds: &Thresholds,
) -> DiffResult<PairAnalysis> {
    let (old, new) = normalize_pair(old, new)?;
    let scores = score_pair(&old, &new)?;
    let changed = is_changed(scores.hash_distance, scores.structural_score, thresholds);

    debug!(
        filename,
        width = new.width(),
        height = new.height(),
        hash_distance = scores.hash_distance,
        structural_score = scores.structural_score,
        changed,
        "scored pair"
    );

    let (regions, new_raster) = if changed {
        let regions = extract_regions(&scores.similarity_map, thresholds.min_region_area);
        (regions, Some(new.into_rgb()))
    } else {
        (Vec::new(), None)
    };

    Ok(PairAnalysis {
        filename: filename.to_string(),
        changed,
        hash_distance: scores.hash_distance,
        structural_score: scores.structural_score,
        regions,
        new_raster,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn white(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([255, 255, 255]))
    }

    #[test]
    fn test_identical_screens_are_unchanged() {
        let img = DynamicImage::ImageRgb8(white(320, 200));
        let analysis = analyze_images("same.png", &img, &img, &Thresholds::default()).unwrap();
        assert!(!analysis.changed);
        assert_eq!(analysis.hash_distance, 0.0);
        assert!((analysis.structural_score - 1.0).abs() < 1e-6);
        assert!(analysis.regions.is_empty());
        assert!(analysis.new_raster.is_none());
    }

    #[test]
    fn test_new_button_is_localized() {
        let old = white(800, 600);
        let mut new = old.clone();
        for y in 300..320 {
            for x in 40..190 {
                new.put_pixel(x, y, Rgb([30, 30, 30]));
            }
        }

        let analysis = analyze_images(
            "login.png",
            &DynamicImage::ImageRgb8(old),
            &DynamicImage::ImageRgb8(new),
            &Thresholds::default(),
        )
        .unwrap();

        assert!(analysis.changed);
        assert!(analysis.structural_score < 1.0);
        assert_eq!(analysis.regions.len(), 1);

        let region = &analysis.regions[0];
        assert!(region.x <= 40 && region.x >= 34);
        assert!(region.y <= 300 && region.y >= 294);
        assert!(region.x + region.width >= 190 && region.x + region.width <= 196);
        assert!(region.y + region.height >= 320 && region.y + region.height <= 326);
        assert_eq!(region.kind, RegionKind::SpacingChange);
        assert_eq!(
            analysis.new_raster.map(|r| r.dimensions()),
            Some((800, 600))
        );
    }

    #[test]
    fn test_size_mismatch_is_normalized() {
        let old = DynamicImage::ImageRgb8(white(100, 80));
        let new = DynamicImage::ImageRgb8(white(120, 60));
        let analysis = analyze_images("resized.png", &old, &new, &Thresholds::default()).unwrap();
        assert!(!analysis.changed);
    }

    #[test]
    fn test_missing_file_fails_pair() {
        let pair = ImagePair::new("/nonexistent/old.png", "/nonexistent/new.png", "x.png");
        let err = analyze_pair(&pair, &Thresholds::default()).unwrap_err();
        assert!(matches!(err, DiffError::ImageLoad { .. }));
    }
}
