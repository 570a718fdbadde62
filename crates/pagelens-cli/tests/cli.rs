//! End-to-end tests of the `pagelens` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{GrayImage, Luma};
use predicates::prelude::*;
use tempfile::TempDir;

fn pagelens() -> Command {
    Command::cargo_bin("pagelens").unwrap()
}

/// White page with two dark words of four glyphs each.
fn write_page(dir: &Path) -> PathBuf {
    let image = GrayImage::from_fn(120, 40, |x, y| {
        let glyph = (10..20).contains(&y)
            && ((10..40).contains(&x) || (60..90).contains(&x))
            && x % 8 < 6;
        Luma([if glyph { 0 } else { 255 }])
    });
    let path = dir.join("page.png");
    image.save(&path).unwrap();
    path
}

fn config_arg(dir: &TempDir) -> String {
    dir.path().join("config.json").display().to_string()
}

#[test]
fn test_help_lists_commands() {
    pagelens()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("boxes"))
        .stdout(predicate::str::contains("text-boxes"))
        .stdout(predicate::str::contains("orientation"));
}

#[test]
fn test_word_boxes() {
    let dir = TempDir::new().unwrap();
    let page = write_page(dir.path());

    let output = pagelens()
        .args(["boxes", "--unit", "word"])
        .arg(&page)
        .output()
        .unwrap();
    assert!(output.status.success());

    let boxes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let boxes = boxes.as_array().unwrap();
    assert_eq!(boxes.len(), 2);
    assert_eq!(boxes[0]["flags"], 1);
    assert_eq!(boxes[1]["flags"], 2);
    assert_eq!(boxes[0]["rect"]["left"], 10);
}

#[test]
fn test_line_boxes_to_file() {
    let dir = TempDir::new().unwrap();
    let page = write_page(dir.path());
    let out = dir.path().join("lines.json");

    pagelens()
        .args(["boxes", "--unit", "line", "-o"])
        .arg(&out)
        .arg(&page)
        .assert()
        .success();

    let boxes: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(boxes.as_array().unwrap().len(), 1);
    assert_eq!(boxes[0]["flags"], 0);
}

#[test]
fn test_bad_unit_is_rejected() {
    let dir = TempDir::new().unwrap();
    let page = write_page(dir.path());

    pagelens()
        .args(["boxes", "--unit", "paragraph"])
        .arg(&page)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown text unit"));
}

#[test]
fn test_text_needs_a_model() {
    let dir = TempDir::new().unwrap();
    let page = write_page(dir.path());

    pagelens()
        .args(["--config", &config_arg(&dir)])
        .arg("config")
        .arg("init")
        .assert()
        .success();

    pagelens()
        .args(["--config", &config_arg(&dir), "text"])
        .arg(&page)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no model loaded"));
}

#[test]
fn test_missing_input() {
    pagelens()
        .args(["orientation", "/definitely/not/here.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_orientation_reports_json() {
    let dir = TempDir::new().unwrap();
    let page = write_page(dir.path());

    pagelens()
        .arg("orientation")
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rotation\""))
        .stdout(predicate::str::contains("\"confidence\""));
}

#[test]
fn test_vars() {
    let dir = TempDir::new().unwrap();
    let config = config_arg(&dir);

    pagelens()
        .args(["--config", &config, "config", "init"])
        .assert()
        .success();

    pagelens()
        .args(["--config", &config, "vars"])
        .assert()
        .success()
        .stdout(predicate::str::contains("threshold_window"))
        .stdout(predicate::str::contains("preserve_interword_spaces"));

    pagelens()
        .args(["--config", &config, "vars", "--get", "word_gap"])
        .assert()
        .success()
        .stdout("0.5\n");

    pagelens()
        .args(["--config", &config, "vars", "--set", "no_such_var=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown variable"));

    pagelens()
        .args(["--config", &config, "vars", "--set", "word_gap=0.8", "--save"])
        .assert()
        .success();

    pagelens()
        .args(["--config", &config, "vars", "--get", "word_gap"])
        .assert()
        .success()
        .stdout("0.8\n");
}

#[test]
fn test_config_get_and_set() {
    let dir = TempDir::new().unwrap();
    let config = config_arg(&dir);

    pagelens()
        .args(["--config", &config, "config", "init"])
        .assert()
        .success();

    pagelens()
        .args(["--config", &config, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    pagelens()
        .args(["--config", &config, "config", "get", "model.lang"])
        .assert()
        .success()
        .stdout("\"eng\"\n");

    pagelens()
        .args(["--config", &config, "config", "set", "model.lang", "pol"])
        .assert()
        .success();

    pagelens()
        .args(["--config", &config, "config", "set", "engine.variables.block_gap", "3"])
        .assert()
        .success();

    pagelens()
        .args(["--config", &config, "config", "set", "engine.variables.block_gap", "-3"])
        .assert()
        .failure();

    pagelens()
        .args(["--config", &config, "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lang\": \"pol\""))
        .stdout(predicate::str::contains("\"block_gap\": \"3\""));
}

#[test]
fn test_batch_needs_a_model() {
    let dir = TempDir::new().unwrap();
    write_page(dir.path());
    let config = config_arg(&dir);

    pagelens()
        .args(["--config", &config, "config", "init"])
        .assert()
        .success();

    let pattern = dir.path().join("*.png").display().to_string();
    pagelens()
        .args(["--config", &config, "batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No recognition model"));
}
