//! Pairing of the two screenshot directories and the batch run over them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::artifact::ArtifactWriter;
use crate::config::DiffConfig;
use crate::error::{DiffError, DiffResult, NarrationError};
use crate::narration::{NarrationProvider, NarrationRequest};
use crate::verdict::{ComparisonVerdict, ImagePair};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairListing {
    /// Sorted by filename
    pub pairs: Vec<ImagePair>,
    /// Present in the new directory only
    pub unmatched_new: Vec<String>,
    /// Present in the old directory only
    pub unmatched_old: Vec<String>,
}

fn list_images(dir: &Path) -> DiffResult<BTreeMap<String, PathBuf>> {
    let read_dir_err = |source| DiffError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut images = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if !path.is_file() || !is_supported_image(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            images.insert(name.to_string(), path.clone());
        }
    }
    Ok(images)
}

/// Pairs files by identical filename. Files without a counterpart are
/// reported and logged, never guessed at.
pub fn match_pairs(old_dir: &Path, new_dir: &Path) -> DiffResult<PairListing> {
    let mut old_images = list_images(old_dir)?;
    let new_images = list_images(new_dir)?;
    let mut listing = PairListing::default();

    for (filename, new_path) in new_images {
        match old_images.remove(&filename) {
            Some(old_path) => listing
                .pairs
                .push(ImagePair::new(old_path, new_path, filename)),
            None => {
                warn!(filename = %filename, "new screenshot has no old counterpart, skipping");
                listing.unmatched_new.push(filename);
            }
        }
    }
    for filename in old_images.into_keys() {
        warn!(filename = %filename, "old screenshot has no new counterpart, skipping");
        listing.unmatched_old.push(filename);
    }

    Ok(listing)
}

/// Shared stop signal. Once set, no new pair is scheduled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Sorted by filename
    pub verdicts: Vec<ComparisonVerdict>,
    pub failures: Vec<PairFailure>,
    /// Pairs never started because the run was cancelled
    pub skipped: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.verdicts.len()
    }

    pub fn changed(&self) -> usize {
        self.verdicts.iter().filter(|v| v.changed).count()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} changed={} failed={}",
            self.processed(),
            self.changed(),
            self.failed()
        )?;
        if self.cancelled {
            write!(f, " cancelled (skipped={})", self.skipped)?;
        }
        Ok(())
    }
}

/// Shared, read-only state of one run.
struct RunContext {
    config: DiffConfig,
    writer: ArtifactWriter,
    narrator: Option<Arc<dyn NarrationProvider>>,
}

pub struct BatchRunner {
    context: Arc<RunContext>,
    cancel: CancelFlag,
}

impl BatchRunner {
    /// Fails only when the output directory cannot be created.
    pub fn new(
        config: DiffConfig,
        narrator: Option<Arc<dyn NarrationProvider>>,
    ) -> DiffResult<Self> {
        let writer = ArtifactWriter::create(&config.output_dir, config.artifact_mode)?;
        Ok(Self {
            context: Arc::new(RunContext {
                config,
                writer,
                narrator,
            }),
            cancel: CancelFlag::new(),
        })
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Processes every pair on a bounded pool. A failing pair is logged and
    /// recorded; it never stops the others.
    pub async fn run(&self, pairs: Vec<ImagePair>) -> BatchSummary {
        let total = pairs.len();
        let workers = self.context.config.workers.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut filenames: HashMap<task::Id, String> = HashMap::new();
        let mut summary = BatchSummary::default();

        info!(pairs = total, workers, "starting comparison batch");

        for (index, pair) in pairs.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                summary.skipped = total - index;
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                summary.skipped = total - index;
                break;
            }

            let context = Arc::clone(&self.context);
            let filename = pair.filename.clone();
            let handle = tasks.spawn(async move {
                let _permit = permit;
                process_pair(context, pair).await
            });
            filenames.insert(handle.id(), filename);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            record_outcome(joined, &mut filenames, &mut summary);
        }

        summary.verdicts.sort_by(|a, b| a.filename.cmp(&b.filename));
        summary.failures.sort_by(|a, b| a.filename.cmp(&b.filename));
        info!(summary = %summary, "batch finished");
        summary
    }
}

/// Files one finished task into the summary. Panicked tasks are still
/// attributed to their pair through the task id.
fn record_outcome(
    joined: Result<(task::Id, DiffResult<ComparisonVerdict>), JoinError>,
    filenames: &mut HashMap<task::Id, String>,
    summary: &mut BatchSummary,
) {
    let (id, outcome) = match joined {
        Ok((id, outcome)) => (id, outcome),
        Err(e) => (e.id(), Err(DiffError::Worker(e))),
    };
    let filename = filenames
        .remove(&id)
        .unwrap_or_else(|| format!("<task {id}>"));

    match outcome {
        Ok(verdict) => summary.verdicts.push(verdict),
        Err(e) => {
            error!(filename = %filename, error = %e, "pair failed");
            summary.failures.push(PairFailure {
                filename,
                error: e.to_string(),
            });
        }
    }
}

async fn process_pair(context: Arc<RunContext>, pair: ImagePair) -> DiffResult<ComparisonVerdict> {
    let thresholds = context.config.thresholds;
    let analysis = {
        let pair = pair.clone();
        tokio::task::spawn_blocking(move || crate::analyze_pair(&pair, &thresholds)).await??
    };

    info!(
        filename = %analysis.filename,
        hash_distance = analysis.hash_distance,
        structural_score = analysis.structural_score,
        changed = analysis.changed,
        regions = analysis.regions.len(),
        "compared"
    );

    let narration = match (&context.narrator, analysis.changed) {
        (Some(narrator), true) => {
            narrate(narrator.as_ref(), &pair, context.config.narration_timeout).await
        }
        _ => None,
    };

    let (verdict, raster) = analysis.into_verdict(narration);
    let writer_context = Arc::clone(&context);
    let verdict = tokio::task::spawn_blocking(move || {
        let written = writer_context.writer.write(&verdict, raster.as_ref())?;
        debug!(filename = %verdict.filename, files = written.len(), "artifacts written");
        Ok::<_, DiffError>(verdict)
    })
    .await??;

    Ok(verdict)
}

/// Any failure, including the timeout, degrades to "no narration".
async fn narrate(
    narrator: &dyn NarrationProvider,
    pair: &ImagePair,
    timeout: std::time::Duration,
) -> Option<String> {
    let result = match tokio::time::timeout(timeout, async {
        let request = NarrationRequest::for_pair(pair).await?;
        narrator.narrate(&request).await
    })
    .await
    {
        Ok(result) => result,
        Err(_) => Err(NarrationError::Timeout(timeout)),
    };

    match result {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(
                filename = %pair.filename,
                provider = narrator.name(),
                error = %e,
                "narration unavailable"
            );
            None
        }
    }
}
