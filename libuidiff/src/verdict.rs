use std::path::PathBuf;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::region::DiffRegion;

/// Two screenshots of the same screen, joined on `filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub filename: String,
}

impl ImagePair {
    pub fn new(old_path: impl Into<PathBuf>, new_path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
            filename: filename.into(),
        }
    }
}

/// Final outcome for one pair. Built once, after narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonVerdict {
    pub filename: String,
    pub changed: bool,
    pub hash_distance: f64,
    pub structural_score: f64,
    pub regions: Vec<DiffRegion>,
    pub narration: Option<String>,
}

/// Scores and regions of a pair, before narration is attached.
#[derive(Debug, Clone)]
pub struct PairAnalysis {
    pub filename: String,
    pub changed: bool,
    pub hash_distance: f64,
    pub structural_score: f64,
    pub regions: Vec<DiffRegion>,
    /// Normalized new-version raster, kept only for changed pairs.
    pub new_raster: Option<RgbImage>,
}

impl PairAnalysis {
    pub fn into_verdict(self, narration: Option<String>) -> (ComparisonVerdict, Option<RgbImage>) {
        let verdict = ComparisonVerdict {
            filename: self.filename,
            changed: self.changed,
            hash_distance: self.hash_distance,
            structural_score: self.structural_score,
            regions: self.regions,
            narration,
        };
        (verdict, self.new_raster)
    }
}
