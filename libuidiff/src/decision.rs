use crate::config::Thresholds;

/// Either signal alone marks the pair as changed.
pub fn is_changed(hash_distance: f64, structural_score: f64, thresholds: &Thresholds) -> bool {
    hash_distance > thresholds.hash_distance_threshold
        || structural_score < thresholds.structural_score_threshold
}
