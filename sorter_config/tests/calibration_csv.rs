use std::fs::File;
use std::io::Write;

use rstest::rstest;
use sorter_config::{Calibration, CalibrationRow, Config, load_calibration_csv};
use tempfile::tempdir;

fn row(raw: i64, grams: f32) -> CalibrationRow {
    CalibrationRow { raw, grams }
}

#[rstest]
fn two_points_give_exact_fit() {
    let c = Calibration::from_rows(&[row(100, 0.0), row(200, 100.0)]).unwrap();
    assert!((c.grams_per_count - 1.0).abs() < 1e-6);
    assert_eq!(c.zero_counts, 100);
    assert!((c.reference_unit() - 1.0).abs() < 1e-6);
}

#[rstest]
fn negative_wiring_gives_negative_reference_unit() {
    // ~ -1000 counts per gram
    let c = Calibration::from_rows(&[row(0, 0.0), row(-10_000, 10.0), row(-20_000, 20.0)])
        .unwrap();
    assert!((c.reference_unit() + 1000.0).abs() < 1e-2);
    assert_eq!(c.zero_counts, 0);
}

#[rstest]
fn outlier_is_rejected_on_refit() {
    let rows = [
        row(0, 0.0),
        row(100, 10.0),
        row(200, 20.0),
        row(300, 30.0),
        row(400, 40.0),
        row(500, 50.0),
        row(600, 60.0),
        row(700, 70.0),
        row(800, 80.0),
        row(900, 140.0),
    ];
    let c = Calibration::from_rows(&rows).unwrap();
    assert!(
        (c.grams_per_count - 0.1).abs() < 1e-4,
        "slope {}",
        c.grams_per_count
    );
}

#[rstest]
#[case(&[row(100, 0.0)][..], "at least two rows")]
#[case(&[row(100, 0.0), row(100, 10.0)][..], "duplicate raw")]
#[case(&[row(100, 0.0), row(200, 10.0), row(150, 20.0)][..], "monotonic")]
#[case(&[row(100, 5.0), row(200, 5.0)][..], "slope")]
fn rejects_bad_rows(#[case] rows: &[CalibrationRow], #[case] needle: &str) {
    let err = Calibration::from_rows(rows).unwrap_err();
    assert!(format!("{err}").contains(needle), "{err}");
}

#[test]
fn csv_with_wrong_headers_is_rejected() {
    let dir = tempdir().unwrap();
    let p = dir.path().join("cal.csv");
    let mut f = File::create(&p).unwrap();
    writeln!(f, "counts,g\n1,0\n2,1").unwrap();
    let err = load_calibration_csv(&p).unwrap_err();
    assert!(format!("{err}").contains("raw,grams"));
}

#[test]
fn csv_calibration_replaces_reference_unit() {
    let dir = tempdir().unwrap();
    let p = dir.path().join("cal.csv");
    let mut f = File::create(&p).unwrap();
    writeln!(f, "raw,grams\n842913,0.0\n736039,100.0").unwrap();

    let cal = load_calibration_csv(&p).unwrap();
    let mut cfg = Config::default();
    cfg.apply_calibration(&cal);
    assert!((cfg.scale.reference_unit + 1068.74).abs() < 0.01);
    cfg.validate().unwrap();
}

#[test]
fn csv_bad_row_reports_line() {
    let dir = tempdir().unwrap();
    let p = dir.path().join("cal.csv");
    std::fs::write(&p, "raw,grams\n1,0\nabc,1\n").unwrap();
    let err = load_calibration_csv(&p).unwrap_err();
    assert!(format!("{err}").contains("row 3"), "{err}");
}
