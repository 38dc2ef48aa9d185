use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Short timings so simulated servo runs finish quickly.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[server]
bind = "127.0.0.1:0"

[remote]
base_url = "http://127.0.0.1:9"
start_timeout_ms = 200
stop_timeout_ms = 200

[camera]
candidates = [0]

[timing]
gate_settle_ms = 1
slap_travel_ms = 1
slap_return_ms = 1
gate_return_ms = 1
park_ms = 1
flash_ms = 1
weigh_settle_ms = 1
"#;
    let path = dir.path().join("sorter.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn sorter(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("sorter").unwrap();
    for var in ["BASE_URL", "PI_SECRET", "BIN_ID", "MODEL_PATH", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["--sim", "self-check"], 0, "camera", "stdout")]
#[case(&["sort", "--label", "other", "--sim"], 0, "sorted Other", "stdout")]
#[case(&["sort", "--label", "plastic", "--sim"], 0, "sorted Plastic", "stdout")]
#[case(&["sort", "--sim"], 2, "required", "stderr")]
#[case(&["sort", "--label", "glass", "--sim"], 2, "invalid value", "stderr")]
#[case(&["calibrate", "--known-grams", "0", "--sim"], 1, "known-grams", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = sorter(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn missing_config_file_means_defaults() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("absent.toml");
    sorter(&cfg)
        .args(["--sim", "sort", "--label", "other"])
        .assert()
        .success();
}

#[test]
fn self_check_json_lists_every_device() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = sorter(&cfg)
        .args(["--json", "--sim", "self-check"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"], true);
    let names: Vec<&str> = v["devices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["device"].as_str().unwrap())
        .collect();
    for device in ["servos", "light", "scale", "metal", "camera", "model"] {
        assert!(names.contains(&device), "{device} missing from {names:?}");
    }
}

#[test]
fn invalid_config_exits_2() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[servo]\npwm_hz = 0\n").unwrap();
    sorter(&cfg)
        .args(["--sim", "self-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("servo.pwm_hz"));
}

#[test]
fn invalid_config_json_error_has_reason() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[scale]\nsamples = 0\n").unwrap();
    let out = sorter(&cfg)
        .args(["--json", "--sim", "self-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let line = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 2);
}

#[test]
fn environment_override_is_validated() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    sorter(&cfg)
        .env("BASE_URL", "ftp://example.invalid")
        .args(["--sim", "self-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("remote.base_url"));
}

#[test]
fn cli_reports_bad_calibration_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("calib.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "raw,value").unwrap();
    writeln!(f, "100,0.0").unwrap();
    writeln!(f, "200,1.0").unwrap();

    sorter(&cfg)
        .arg("--calibration")
        .arg(&bad_csv)
        .args(["--sim", "self-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("headers 'raw,grams'"));
}

#[test]
fn simulated_scale_calibration_needs_a_load() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    assert_cmd::Command::from_std(sorter(&cfg))
        .args(["--sim", "calibrate", "--known-grams", "100", "--samples", "5"])
        .write_stdin("\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no change detected"));
}

#[rstest]
#[case([220, 30, 30], "Can")]
#[case([30, 220, 30], "Other")]
#[case([30, 30, 220], "Plastic")]
fn classify_image_with_simulated_model(#[case] rgb: [u8; 3], #[case] label: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let img_path = dir.path().join("item.png");
    image::RgbImage::from_pixel(16, 12, image::Rgb(rgb))
        .save(&img_path)
        .unwrap();

    let out = sorter(&cfg)
        .args(["--json", "--sim", "classify", "--image"])
        .arg(&img_path)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["label"], label);
    assert_eq!(v["scores"].as_array().unwrap().len(), 3);
}

#[test]
fn classify_missing_image_fails() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    sorter(&cfg)
        .args(["--sim", "classify", "--image"])
        .arg(dir.path().join("nope.png"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope.png"));
}
