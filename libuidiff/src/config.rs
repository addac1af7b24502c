use std::path::PathBuf;
use std::time::Duration;

/// Decision thresholds, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// A pair is changed when the hash distance is strictly above this.
    pub hash_distance_threshold: f64,
    /// A pair is changed when the structural score is strictly below this.
    pub structural_score_threshold: f64,
    /// Regions with `width * height <= min_region_area` are dropped.
    pub min_region_area: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hash_distance_threshold: 0.1,
            structural_score_threshold: 0.995,
            min_region_area: 100,
        }
    }
}

/// Which artifacts are written per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactMode {
    /// Annotated image only
    Image,
    /// Text and JSON reports only
    Report,
    #[default]
    Both,
}

impl ArtifactMode {
    pub fn writes_image(self) -> bool {
        matches!(self, ArtifactMode::Image | ArtifactMode::Both)
    }

    pub fn writes_report(self) -> bool {
        matches!(self, ArtifactMode::Report | ArtifactMode::Both)
    }
}

#[derive(Debug, Clone)]
pub struct DiffConfig {
    pub thresholds: Thresholds,
    pub output_dir: PathBuf,
    pub artifact_mode: ArtifactMode,
    /// Upper bound on pairs processed at the same time
    pub workers: usize,
    pub narration_timeout: Duration,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            output_dir: PathBuf::from("screenshots/diff"),
            artifact_mode: ArtifactMode::default(),
            workers: default_workers(),
            narration_timeout: Duration::from_secs(60),
        }
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
