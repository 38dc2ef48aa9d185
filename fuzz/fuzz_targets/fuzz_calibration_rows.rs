#![no_main]
use libfuzzer_sys::fuzz_target;
use sorter_config::{Calibration, CalibrationRow};

fuzz_target!(|pairs: Vec<(i64, f32)>| {
    let rows: Vec<CalibrationRow> = pairs
        .into_iter()
        .map(|(raw, grams)| CalibrationRow { raw, grams })
        .collect();
    if let Ok(cal) = Calibration::from_rows(&rows) {
        let _ = cal.reference_unit();
    }
});
