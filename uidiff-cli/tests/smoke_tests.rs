use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn blank() -> RgbImage {
    RgbImage::from_pixel(160, 120, Rgb([255, 255, 255]))
}

fn with_bar() -> RgbImage {
    let mut img = blank();
    for y in 60..72 {
        for x in 10..150 {
            img.put_pixel(x, y, Rgb([40, 40, 40]));
        }
    }
    img
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("old")).unwrap();
    fs::create_dir_all(dir.path().join("new")).unwrap();
    blank().save(dir.path().join("old/home.png")).unwrap();
    with_bar().save(dir.path().join("new/home.png")).unwrap();
    blank().save(dir.path().join("old/about.png")).unwrap();
    blank().save(dir.path().join("new/about.png")).unwrap();
    dir
}

fn uidiff(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("uidiff").unwrap();
    cmd.current_dir(dir)
        .env_remove("MIN_HASH_DIFF")
        .env_remove("MAX_SSIM_SCORE")
        .env("RUST_LOG", "warn")
        .args(["old", "new", "--output-dir", "diff"]);
    cmd
}

#[test]
fn test_offline_run_writes_artifacts() {
    let dir = setup();

    uidiff(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("home.png: CHANGED"))
        .stdout(predicate::str::contains("about.png: unchanged"))
        .stdout(predicate::str::contains("processed=2 changed=1 failed=0"));

    assert!(dir.path().join("diff/diff_home.png").exists());
    assert!(!dir.path().join("diff/diff_about.png").exists());
    let report = fs::read_to_string(dir.path().join("diff/home.png.txt")).unwrap();
    assert!(report.starts_with("Analysis for home.png:"));
    assert!(report.contains("Status: CHANGED"));
    assert!(!report.contains("AI Analysis"));
}

#[test]
fn test_json_output() {
    let dir = setup();

    let output = uidiff(dir.path()).arg("--json").assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["processed"], 2);
    assert_eq!(value["changed"], 1);
    assert_eq!(value["verdicts"][0]["filename"], "about.png");
    assert_eq!(value["verdicts"][1]["changed"], true);
}

#[test]
fn test_corrupt_pair_fails_run_but_not_others() {
    let dir = setup();
    fs::write(dir.path().join("old/broken.png"), b"nope").unwrap();
    blank().save(dir.path().join("new/broken.png")).unwrap();

    uidiff(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("processed=2 changed=1 failed=1"));
    assert!(dir.path().join("diff/home.png.json").exists());
}

#[test]
fn test_report_only_mode() {
    let dir = setup();

    uidiff(dir.path()).args(["--artifacts", "report"]).assert().success();
    assert!(dir.path().join("diff/home.png.json").exists());
    assert!(!dir.path().join("diff/diff_home.png").exists());
}

#[test]
fn test_html_report() {
    let dir = setup();

    uidiff(dir.path()).arg("--html").assert().success();
    let html = fs::read_to_string(dir.path().join("diff/report.html")).unwrap();
    assert!(html.contains("<h1>UI Diff Report</h1>"));
    assert!(html.contains("diff_home.png"));
}

#[test]
fn test_missing_directory() {
    let dir = TempDir::new().unwrap();

    uidiff(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error listing screenshots"));
}

#[test]
fn test_ai_without_key_fails_fast() {
    let dir = setup();

    uidiff(dir.path())
        .env_remove("OPENAI_API_KEY")
        .args(["--ai", "openai"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
