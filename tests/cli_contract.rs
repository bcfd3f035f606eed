use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::tempdir;

fn write_scene(path: &Path, yaml: &str) {
    fs::write(path, yaml).expect("scene should write");
}

fn run_dotswarm(cwd: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_dotswarm"))
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("dotswarm command should run")
}

const SMALL_SCENE: &str = r##"
canvas: { width: 130, height: 130 }
fps: 10
seed: 1
sequence: "#countdown 2|Hi|"
"##;

#[test]
fn version_flag_reports_package_version() {
    let dir = tempdir().expect("tempdir should create");
    let output = run_dotswarm(dir.path(), &["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "stdout was: {stdout}");
}

#[test]
fn check_accepts_the_default_scene() {
    let dir = tempdir().expect("tempdir should create");
    let output = run_dotswarm(dir.path(), &["check"]);
    assert!(output.status.success(), "check without a scene should pass");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("OK: <default>"));
    assert!(stdout.contains("1280x720"));
}

#[test]
fn check_prints_scene_summary() {
    let dir = tempdir().expect("tempdir should create");
    let scene_path = dir.path().join("scene.yaml");
    write_scene(&scene_path, SMALL_SCENE);

    let output = run_dotswarm(dir.path(), &["check", "scene.yaml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("130x130"));
    assert!(stdout.contains("10 fps"));
    assert!(stdout.contains("Tokens: 3"));
}

#[test]
fn check_rejects_invalid_grid_codes() {
    let dir = tempdir().expect("tempdir should create");
    let scene_path = dir.path().join("scene.yaml");
    write_scene(
        &scene_path,
        r#"
custom_shape:
  grid:
    - [0, 9]
"#,
    );

    let output = run_dotswarm(dir.path(), &["check", "scene.yaml"]);
    assert!(!output.status.success(), "code 9 must be rejected");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("code 9"), "stderr was: {stderr}");
}

#[test]
fn trace_reports_the_switch_sequence() {
    let dir = tempdir().expect("tempdir should create");
    let scene_path = dir.path().join("scene.yaml");
    write_scene(&scene_path, SMALL_SCENE);

    let output = run_dotswarm(dir.path(), &["trace", "scene.yaml", "--seconds", "6"]);
    assert!(output.status.success(), "trace should succeed");

    let log: Value =
        serde_json::from_slice(&output.stdout).expect("trace output should be valid json");
    let shapes: Vec<&str> = log
        .as_array()
        .expect("trace output should be an array")
        .iter()
        .map(|record| record["shape"].as_str().expect("shape is a string"))
        .collect();
    assert_eq!(shapes, vec!["2", "1", "0", "Hi", ""]);

    let final_points = log[4]["points"].as_u64().expect("points is a number");
    assert_eq!(final_points, 0, "the trailing blank token clears the shape");
}

#[test]
fn trace_is_deterministic_across_runs() {
    let dir = tempdir().expect("tempdir should create");
    let scene_path = dir.path().join("scene.yaml");
    write_scene(&scene_path, SMALL_SCENE);

    let first = run_dotswarm(dir.path(), &["trace", "scene.yaml", "--seconds", "6"]);
    let second = run_dotswarm(dir.path(), &["trace", "scene.yaml", "--seconds", "6"]);
    assert!(first.status.success() && second.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn render_writes_png_frames() {
    let dir = tempdir().expect("tempdir should create");
    let scene_path = dir.path().join("scene.yaml");
    write_scene(&scene_path, SMALL_SCENE);

    let output = run_dotswarm(
        dir.path(),
        &[
            "render", "scene.yaml", "-o", "frames", "--seconds", "1", "--every", "5",
        ],
    );
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let frames_dir = dir.path().join("frames");
    assert!(frames_dir.join("frame_00000.png").exists());
    assert!(frames_dir.join("frame_00005.png").exists());
    assert!(!frames_dir.join("frame_00001.png").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wrote 2 frames"));
}
