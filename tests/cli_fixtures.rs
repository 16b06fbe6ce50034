use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_phase_cli"))
}

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("phase_cli_{}_{}", std::process::id(), name))
}

#[test]
fn synthetic_groove_reports_phases() {
    let output = cli()
        .args(["synthetic", "--pattern", "groove"])
        .output()
        .expect("failed to run phase_cli synthetic");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("track descriptors JSON");
    let phases = json["phases"].as_array().expect("phases array");
    assert!(!phases.is_empty());
    assert_eq!(phases[0]["structural_type"], "Rhythmic/Percussive");
    assert_eq!(json["duration_secs"], 60.0);
}

#[test]
fn analyze_round_trips_generated_frames() {
    let frames_path = temp_file("ramp_frames.json");
    let report_path = temp_file("ramp_report.json");

    let output = cli()
        .args(["synthetic", "--pattern", "ramp", "--frames-output"])
        .arg(&frames_path)
        .output()
        .expect("failed to generate frames");
    assert!(output.status.success());
    let synthetic: Value =
        serde_json::from_slice(&output.stdout).expect("synthetic report JSON");

    let output = cli()
        .arg("analyze")
        .arg("--input")
        .arg(&frames_path)
        .arg("--output")
        .arg(&report_path)
        .output()
        .expect("failed to run phase_cli analyze");
    assert!(output.status.success());

    let written = std::fs::read_to_string(&report_path).expect("report written");
    let analyzed: Value = serde_json::from_str(&written).expect("report JSON");
    let _ = std::fs::remove_file(&frames_path);
    let _ = std::fs::remove_file(&report_path);

    assert_eq!(synthetic["phases"], analyzed["phases"]);
}

#[test]
fn table_format_lists_phase_ranges() {
    let output = cli()
        .args(["synthetic", "--pattern", "silence", "--format", "table"])
        .output()
        .expect("failed to run table output");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(stdout.contains("00:00-00:10"), "got {stdout}");
    assert!(stdout.contains("Outro/Fade"), "got {stdout}");
}

#[test]
fn dump_config_prints_defaults() {
    let output = cli()
        .arg("dump-config")
        .output()
        .expect("failed to run dump-config");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("config JSON");
    assert_eq!(json["segmentation"]["min_segment_duration_secs"], 5.0);
    assert!(json["moods"].is_object());
    assert!(json["character"].is_object());
}

#[test]
fn missing_input_fails() {
    let output = cli()
        .args(["analyze", "--input", "/nonexistent/frames.json"])
        .output()
        .expect("failed to run analyze");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("reading feature stream"), "got {stderr}");
}

#[test]
fn invalid_config_fails() {
    let config_path = temp_file("bad_config.json");
    std::fs::write(&config_path, r#"{"structure": {"climax_percentile": 20.0}}"#)
        .expect("write config");
    let output = cli()
        .args(["synthetic", "--pattern", "groove", "--config"])
        .arg(&config_path)
        .output()
        .expect("failed to run with bad config");
    let _ = std::fs::remove_file(&config_path);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("climax_percentile"), "got {stderr}");
}
