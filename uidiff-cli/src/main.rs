use clap::Parser;
use libuidiff::config::{default_workers, ArtifactMode, DiffConfig, Thresholds};
use libuidiff::narration::{anthropic, openai, AnthropicNarrator, NarrationProvider, OpenAiNarrator};
use libuidiff::{match_pairs, BatchRunner, BatchSummary, NarrationError};

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod html_report;

/// Exit status when the run was interrupted before every pair was scheduled.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compare UI screenshots between two releases", long_about = None)]
struct Args {
    /// Directory with screenshots of the previous release
    #[arg(default_value = "screenshots/old")]
    old_dir: PathBuf,

    /// Directory with screenshots of the new release
    #[arg(default_value = "screenshots/new")]
    new_dir: PathBuf,

    /// Pairs whose hash distance is above this are changed
    #[arg(long, env = "MIN_HASH_DIFF", default_value_t = Thresholds::default().hash_distance_threshold)]
    hash_threshold: f64,

    /// Pairs whose SSIM score is below this are changed
    #[arg(long, env = "MAX_SSIM_SCORE", default_value_t = Thresholds::default().structural_score_threshold)]
    ssim_threshold: f64,

    /// Regions with width * height at or below this are dropped
    #[arg(long, default_value_t = Thresholds::default().min_region_area)]
    min_region_area: u32,

    /// Where annotated images and reports are written
    #[arg(long, short = 'o', default_value = "screenshots/diff")]
    output_dir: PathBuf,

    /// Which artifacts to write for each pair
    #[arg(long, default_value = "both")]
    artifacts: ArtifactsArg,

    /// Number of pairs compared at the same time (defaults to CPU count)
    #[arg(long, short = 'j')]
    jobs: Option<usize>,

    /// Ask an AI provider to describe the changes of changed pairs
    #[arg(long)]
    ai: Option<AiProvider>,

    /// Model name passed to the provider
    #[arg(long, requires = "ai")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible server
    #[arg(long, requires = "ai")]
    api_base: Option<String>,

    /// Seconds to wait for a narration before giving up on it
    #[arg(long, default_value_t = 60)]
    narration_timeout: u64,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, hide = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true, hide = true)]
    anthropic_api_key: Option<String>,

    /// Print verdicts and failures as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Generate HTML report in the output directory
    #[arg(long, short = 'b')]
    html: bool,

    /// Open HTML report in browser (requires --html)
    #[arg(long, requires = "html")]
    open_browser: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum AiProvider {
    Openai,
    Anthropic,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactsArg {
    Image,
    Report,
    Both,
}

impl std::fmt::Display for ArtifactsArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

impl From<ArtifactsArg> for ArtifactMode {
    fn from(val: ArtifactsArg) -> Self {
        match val {
            ArtifactsArg::Image => ArtifactMode::Image,
            ArtifactsArg::Report => ArtifactMode::Report,
            ArtifactsArg::Both => ArtifactMode::Both,
        }
    }
}

#[derive(Serialize, Debug)]
struct OutputFailure<'a> {
    filename: &'a str,
    error: &'a str,
}

#[derive(Serialize, Debug)]
struct OutputEntry<'a> {
    processed: usize,
    changed: usize,
    failed: usize,
    cancelled: bool,
    unmatched_old: &'a [String],
    unmatched_new: &'a [String],
    verdicts: &'a [libuidiff::ComparisonVerdict],
    failures: Vec<OutputFailure<'a>>,
    processing_time: f64,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_narrator(args: &Args) -> Result<Option<Arc<dyn NarrationProvider>>, NarrationError> {
    let timeout = Duration::from_secs(args.narration_timeout);
    let narrator: Arc<dyn NarrationProvider> = match args.ai {
        None => return Ok(None),
        Some(AiProvider::Openai) => Arc::new(OpenAiNarrator::new(
            args.api_base.as_deref().unwrap_or(openai::DEFAULT_BASE_URL),
            args.openai_api_key.clone().unwrap_or_default(),
            args.model.as_deref().unwrap_or(openai::DEFAULT_MODEL),
            timeout,
        )?),
        Some(AiProvider::Anthropic) => Arc::new(AnthropicNarrator::new(
            args.api_base.as_deref().unwrap_or(anthropic::DEFAULT_BASE_URL),
            args.anthropic_api_key.clone().unwrap_or_default(),
            args.model.as_deref().unwrap_or(anthropic::DEFAULT_MODEL),
            timeout,
        )?),
    };
    Ok(Some(narrator))
}

/// Path of `target` as seen from `base`, falling back to an absolute path.
fn image_src(target: &Path, base: &Path) -> String {
    let target = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
    match fs::canonicalize(base) {
        Ok(base) => match target.strip_prefix(&base) {
            Ok(rel) => rel.display().to_string(),
            Err(_) => format!("file://{}", target.display()),
        },
        Err(_) => target.display().to_string(),
    }
}

fn write_html_report(
    args: &Args,
    summary: &BatchSummary,
    pairs: &[libuidiff::ImagePair],
    unmatched: usize,
    mode: ArtifactMode,
) -> std::io::Result<PathBuf> {
    let html_file_path = args.output_dir.join("report.html");
    let mut html_content = String::new();

    html_content.push_str(&html_report::header("UI Diff Report"));
    html_content.push_str(&html_report::summary(summary, unmatched));

    for verdict in &summary.verdicts {
        let Some(pair) = pairs.iter().find(|p| p.filename == verdict.filename) else {
            continue;
        };
        let images = html_report::SectionImages::new(
            image_src(&pair.old_path, &args.output_dir),
            image_src(&pair.new_path, &args.output_dir),
            verdict,
            mode.writes_image(),
        );
        html_content.push_str(&html_report::verdict_section(verdict, &images));
    }

    html_content.push_str(&html_report::footer());
    fs::write(&html_file_path, html_content)?;
    Ok(html_file_path)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let config = DiffConfig {
        thresholds: Thresholds {
            hash_distance_threshold: args.hash_threshold,
            structural_score_threshold: args.ssim_threshold,
            min_region_area: args.min_region_area,
        },
        output_dir: args.output_dir.clone(),
        artifact_mode: args.artifacts.into(),
        workers: args.jobs.unwrap_or_else(default_workers).max(1),
        narration_timeout: Duration::from_secs(args.narration_timeout),
    };
    let mode = config.artifact_mode;

    let narrator = match build_narrator(&args) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("❌ Error configuring AI provider: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if narrator.is_none() {
        info!("running offline, no narration requested");
    }

    let listing = match match_pairs(&args.old_dir, &args.new_dir) {
        Ok(listing) => listing,
        Err(e) => {
            eprintln!("❌ Error listing screenshots: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let unmatched = listing.unmatched_new.len() + listing.unmatched_old.len();
    if listing.pairs.is_empty() {
        warn!(
            old_dir = %args.old_dir.display(),
            new_dir = %args.new_dir.display(),
            "no screenshot pairs found"
        );
    }

    let runner = match BatchRunner::new(config, narrator) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("❌ Error preparing output directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing pairs already in progress");
            cancel.cancel();
        }
    });

    let start_time = Instant::now();
    let summary = runner.run(listing.pairs.clone()).await;

    if args.json {
        let output_entry = OutputEntry {
            processed: summary.processed(),
            changed: summary.changed(),
            failed: summary.failed(),
            cancelled: summary.cancelled,
            unmatched_old: &listing.unmatched_old,
            unmatched_new: &listing.unmatched_new,
            verdicts: &summary.verdicts,
            failures: summary
                .failures
                .iter()
                .map(|f| OutputFailure {
                    filename: &f.filename,
                    error: &f.error,
                })
                .collect(),
            processing_time: start_time.elapsed().as_secs_f64(),
        };
        match serde_json::to_string_pretty(&output_entry) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ Error serializing JSON: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for verdict in &summary.verdicts {
            let status = if verdict.changed { "CHANGED" } else { "unchanged" };
            println!(
                "{}: {} (hash {:.4}, ssim {:.4}, {} regions)",
                verdict.filename,
                status,
                verdict.hash_distance,
                verdict.structural_score,
                verdict.regions.len()
            );
        }
        println!("{} unmatched={}", summary, unmatched);
    }

    if args.html {
        match write_html_report(&args, &summary, &listing.pairs, unmatched, mode) {
            Ok(html_file_path) => {
                eprintln!("HTML report generated at: {}", html_file_path.display());
                if args.open_browser {
                    if let Err(e) = opener::open(&html_file_path) {
                        eprintln!("❌ Error opening browser: {}", e);
                    }
                }
            }
            Err(e) => {
                eprintln!("❌ Error writing HTML report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    if summary.cancelled {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if summary.failed() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
