//! Turning a similarity map into labelled regions of difference.

use std::fmt;

use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::otsu_level;
use serde::{Deserialize, Serialize};

use crate::similarity::SimilarityMap;
use crate::utils::{binarize_inverted, bounding_rect_from_points, is_uniform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    SpacingChange,
    SizeChange,
    LayoutChange,
}

impl RegionKind {
    /// Aspect-ratio heuristic:
    /// `w/h > 5` or `w/h < 0.2` is spacing, `0.8 <= w/h <= 1.2` is size,
    /// anything else is layout.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height == 0 {
            return RegionKind::SpacingChange;
        }
        let ratio = f64::from(width) / f64::from(height);
        if ratio > 5.0 || ratio < 0.2 {
            RegionKind::SpacingChange
        } else if (0.8..=1.2).contains(&ratio) {
            RegionKind::SizeChange
        } else {
            RegionKind::LayoutChange
        }
    }

    /// Short upper-case tag drawn on annotated images.
    pub fn label(self) -> &'static str {
        match self {
            RegionKind::SpacingChange => "SPACING",
            RegionKind::SizeChange => "SIZE",
            RegionKind::LayoutChange => "LAYOUT",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RegionKind::SpacingChange => "Spacing change",
            RegionKind::SizeChange => "Element size change",
            RegionKind::LayoutChange => "Layout change",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub kind: RegionKind,
}

impl DiffRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            kind: RegionKind::from_dimensions(width, height),
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Otsu-binarizes the inverted map, takes the bounding box of every external
/// contour, drops boxes with `area <= min_region_area` and returns the rest
/// sorted by `(y, x)`.
pub fn extract_regions(map: &SimilarityMap, min_region_area: u32) -> Vec<DiffRegion> {
    let luma = map.to_luma();
    if is_uniform(&luma) {
        return Vec::new();
    }

    let level = otsu_level(&luma);
    let mask = binarize_inverted(&luma, level);
    let contours: Vec<Contour<u32>> = find_contours(&mask);

    let mut regions: Vec<DiffRegion> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| bounding_rect_from_points(&c.points))
        .map(|rect| DiffRegion::new(rect.left() as u32, rect.top() as u32, rect.width(), rect.height()))
        .filter(|r| r.area() > u64::from(min_region_area))
        .collect();

    regions.sort_by_key(|r| (r.y, r.x));
    regions
}
