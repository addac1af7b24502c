//! Persisting verdicts: annotated PNG, text report and JSON verdict.
//!
//! Every file is written to a temporary file inside the output directory and
//! renamed into place, so an interrupted run never leaves a truncated artifact.

use std::fmt::Write as _;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use tempfile::NamedTempFile;

use crate::annotate::annotate;
use crate::config::ArtifactMode;
use crate::error::{DiffError, DiffResult};
use crate::verdict::ComparisonVerdict;

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    mode: ArtifactMode,
}

impl ArtifactWriter {
    /// Creates the output directory if needed. Failing here aborts the run.
    pub fn create(output_dir: impl Into<PathBuf>, mode: ArtifactMode) -> DiffResult<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| DiffError::output_write(&output_dir, e))?;
        Ok(Self { output_dir, mode })
    }

    /// Writes the artifacts for one verdict and returns their paths. Unchanged
    /// pairs always get their reports, whatever the mode, so every processed
    /// pair leaves a pass/fail record.
    pub fn write(
        &self,
        verdict: &ComparisonVerdict,
        new_raster: Option<&RgbImage>,
    ) -> DiffResult<Vec<PathBuf>> {
        let mut written = Vec::new();

        if verdict.changed && self.mode.writes_image() {
            if let Some(raster) = new_raster {
                let annotated = annotate(raster, &verdict.regions);
                let path = self.output_dir.join(annotated_file_name(&verdict.filename));
                self.persist(&path, |w| encode_png(w, &annotated))?;
                written.push(path);
            }
        }

        if self.mode.writes_report() || !verdict.changed {
            let text_path = self.output_dir.join(format!("{}.txt", verdict.filename));
            let text = render_text_report(verdict);
            self.persist(&text_path, |w| {
                w.write_all(text.as_bytes())
                    .map_err(|e| DiffError::output_write(&text_path, e))
            })?;
            written.push(text_path);

            let json_path = self.output_dir.join(format!("{}.json", verdict.filename));
            let json = serde_json::to_string_pretty(verdict)?;
            self.persist(&json_path, |w| {
                w.write_all(json.as_bytes())
                    .map_err(|e| DiffError::output_write(&json_path, e))
            })?;
            written.push(json_path);
        }

        Ok(written)
    }

    fn persist<F>(&self, path: &Path, fill: F) -> DiffResult<()>
    where
        F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> DiffResult<()>,
    {
        let mut tmp =
            NamedTempFile::new_in(&self.output_dir).map_err(|e| DiffError::output_write(path, e))?;
        {
            let mut writer = BufWriter::new(&mut tmp);
            fill(&mut writer)?;
            writer.flush().map_err(|e| DiffError::output_write(path, e))?;
        }
        tmp.persist(path)
            .map_err(|e| DiffError::output_write(path, e.error))?;
        Ok(())
    }
}

/// `diff_<filename>`, with `.png` appended when the source was not a PNG.
pub fn annotated_file_name(filename: &str) -> String {
    if filename.to_ascii_lowercase().ends_with(".png") {
        format!("diff_{filename}")
    } else {
        format!("diff_{filename}.png")
    }
}

fn encode_png<W: Write>(writer: W, raster: &RgbImage) -> DiffResult<()> {
    PngEncoder::new(writer).write_image(
        raster.as_raw(),
        raster.width(),
        raster.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(())
}

/// Plain-text report. Line prefixes are stable so tooling can grep them.
pub fn render_text_report(verdict: &ComparisonVerdict) -> String {
    let mut out = String::new();
    let status = if verdict.changed { "CHANGED" } else { "UNCHANGED" };
    let _ = writeln!(out, "Analysis for {}:", verdict.filename);
    let _ = writeln!(out, "Status: {status}");
    let _ = writeln!(out, "Image hash difference: {}", verdict.hash_distance);
    let _ = writeln!(out, "SSIM score: {}", verdict.structural_score);

    if !verdict.changed {
        let _ = writeln!(out, "No significant UI changes detected.");
        return out;
    }

    let _ = writeln!(out, "Regions: {}", verdict.regions.len());
    for region in &verdict.regions {
        let _ = writeln!(
            out,
            "  - {} at ({}, {}) size {}x{}",
            region.kind, region.x, region.y, region.width, region.height
        );
    }
    if let Some(narration) = &verdict.narration {
        let _ = writeln!(out, "AI Analysis:");
        let _ = writeln!(out, "{narration}");
    }
    out
}
