//! Operator subcommands: self-check, scale calibration, one-off
//! classification and a single actuator run.

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use eyre::{WrapErr, bail};
use serde::Serialize;
use serde_json::json;
use sorter_config::Config;
use sorter_core::Label;
use sorter_core::actuator::ActuatorSequencer;
use sorter_core::camera::FrameSource;
use sorter_core::classifier::Classifier;
use sorter_core::config::CameraCfg;
use sorter_core::metal::MetalDetector;
use sorter_core::weight::WeightSensor;
use sorter_traits::{Frame, MonotonicClock};
use tracing::info;

use crate::devices::{Devices, load_backend};

/// Outcome for one device in `self-check`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckLine {
    pub device: &'static str,
    pub ok: bool,
    pub detail: String,
}

impl CheckLine {
    fn pass(device: &'static str, detail: impl Into<String>) -> Self {
        Self {
            device,
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(device: &'static str, detail: impl std::fmt::Display) -> Self {
        Self {
            device,
            ok: false,
            detail: detail.to_string(),
        }
    }
}

/// Exercise every device once: park the servos, switch the light off, take
/// one weight and metal reading, start and stop the camera, load the model.
pub fn self_check(cfg: &Config, sim: bool) -> Vec<CheckLine> {
    let devices = Devices::open(cfg, sim);
    let mut lines: Vec<CheckLine> = devices
        .faults
        .iter()
        .map(|f| CheckLine::fail(f.device, &f.error))
        .collect();
    let Devices {
        scale,
        metal,
        servos,
        light,
        mut camera,
        ..
    } = devices;

    if let Some(driver) = servos {
        let mut seq = ActuatorSequencer::new(
            Some(driver),
            (&cfg.servo).into(),
            (&cfg.timing).into(),
            Arc::new(MonotonicClock::new()),
        );
        lines.push(match seq.park() {
            Ok(()) => CheckLine::pass("servos", "parked"),
            Err(e) => CheckLine::fail("servos", e),
        });
    }

    if let Some(mut strip) = light {
        lines.push(match strip.fill([0, 0, 0]) {
            Ok(()) => CheckLine::pass("light", "off"),
            Err(e) => CheckLine::fail("light", e),
        });
    }

    if let Some(scale) = scale {
        let mut sensor = WeightSensor::new(scale, (&cfg.scale).into());
        lines.push(match sensor.tare().and_then(|()| sensor.sample()) {
            Ok(g) => CheckLine::pass("scale", format!("{g:.1} g after tare")),
            Err(e) => CheckLine::fail("scale", e),
        });
    }

    if let Some(input) = metal {
        let mut detector = MetalDetector::new(input, cfg.metal.active_low);
        lines.push(match detector.is_metal_present() {
            Ok(true) => CheckLine::pass("metal", "metal present"),
            Ok(false) => CheckLine::pass("metal", "no metal"),
            Err(e) => CheckLine::fail("metal", e),
        });
    }

    let camera_cfg = CameraCfg::from(&cfg.camera);
    lines.push(
        match FrameSource::start(&mut *camera, &camera_cfg.candidates, camera_cfg.retry) {
            Ok(mut source) => {
                let index = source.device_index();
                source.stop();
                CheckLine::pass("camera", format!("index {index}"))
            }
            Err(e) => CheckLine::fail("camera", e),
        },
    );

    lines.push(match load_backend(cfg, sim) {
        Ok(_) if sim => CheckLine::pass("model", "simulated"),
        Ok(_) => CheckLine::pass("model", cfg.model.path.clone()),
        Err(e) => CheckLine::fail("model", e),
    });

    lines
}

/// Print `lines` and fail when any device is not usable.
pub fn report_self_check(lines: &[CheckLine], json: bool) -> eyre::Result<()> {
    let failed = lines.iter().filter(|l| !l.ok).count();
    if json {
        println!("{}", json!({ "ok": failed == 0, "devices": lines }));
    } else {
        for l in lines {
            let mark = if l.ok { "ok" } else { "FAIL" };
            println!("{:<8} {mark:<4} {}", l.device, l.detail);
        }
    }
    if failed > 0 {
        bail!("self-check failed: {failed} device(s) unavailable");
    }
    Ok(())
}

/// Counts per gram from the tared baseline and the loaded average.
pub fn reference_unit(zero_counts: f64, loaded_counts: f64, known_grams: f32) -> eyre::Result<f32> {
    if !known_grams.is_finite() || known_grams <= 0.0 {
        bail!("--known-grams must be > 0");
    }
    let delta = loaded_counts - zero_counts;
    if delta.abs() < 1.0 {
        bail!("no change detected on the scale; is the mass on the platform?");
    }
    Ok((delta / f64::from(known_grams)) as f32)
}

/// Tare, wait for the operator to load `known_grams` and confirm on `input`,
/// then average `samples` trimmed readings.
pub fn calibrate(
    cfg: &Config,
    sim: bool,
    known_grams: f32,
    samples: usize,
    input: &mut dyn BufRead,
    json: bool,
) -> eyre::Result<f32> {
    if !known_grams.is_finite() || known_grams <= 0.0 {
        bail!("--known-grams must be > 0");
    }
    if samples == 0 {
        bail!("--samples must be >= 1");
    }
    let scale = Devices::open(cfg, sim)
        .scale
        .ok_or_else(|| eyre::eyre!("scale unavailable; see the warning above"))?;
    let mut sensor = WeightSensor::new(scale, (&cfg.scale).into());

    eprintln!("Taring: keep the platform empty...");
    sensor.tare()?;
    let zero = sensor.zero_counts();
    eprintln!("Place {known_grams} g on the platform and press Enter.");
    let mut line = String::new();
    input.read_line(&mut line).wrap_err("read confirmation")?;

    let loaded = sensor.raw_average(samples)?;
    let unit = reference_unit(zero, loaded, known_grams)?;
    info!(zero, loaded, reference_unit = unit, "calibration complete");
    if json {
        println!(
            "{}",
            json!({ "zero_counts": zero, "loaded_counts": loaded, "reference_unit": unit })
        );
    } else {
        println!("[scale]\nreference_unit = {unit}");
    }
    Ok(unit)
}

/// Decode an image file into a BGR frame.
pub fn load_frame(path: &Path) -> eyre::Result<Frame> {
    let rgb = image::open(path)
        .wrap_err_with(|| format!("open image {}", path.display()))?
        .to_rgb8();
    let (w, h) = rgb.dimensions();
    let bgr: Vec<u8> = rgb
        .pixels()
        .flat_map(|p| [p.0[2], p.0[1], p.0[0]])
        .collect();
    Frame::from_bgr(w, h, bgr).ok_or_else(|| eyre::eyre!("image {} is empty", path.display()))
}

pub fn classify(cfg: &Config, sim: bool, image: &Path, json: bool) -> eyre::Result<Label> {
    let frame = load_frame(image)?;
    let classifier = Classifier::new(load_backend(cfg, sim)?, (&cfg.model).into());
    let result = classifier.classify(&frame)?;
    if json {
        println!(
            "{}",
            json!({ "label": result.label, "scores": result.raw_scores })
        );
    } else {
        println!("label: {}", result.label);
        println!("scores: {:?}", result.raw_scores);
    }
    Ok(result.label)
}

/// Run the dispense sequence once, as a scan with `label` would.
pub fn sort(cfg: &Config, sim: bool, label: Label) -> eyre::Result<()> {
    let devices = Devices::open(cfg, sim);
    if devices.servos.is_none() {
        bail!("servo driver unavailable; see the warning above");
    }
    let mut seq = ActuatorSequencer::new(
        devices.servos,
        (&cfg.servo).into(),
        (&cfg.timing).into(),
        Arc::new(MonotonicClock::new()),
    );
    seq.sort(label)?;
    println!("sorted {label}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_unit_is_counts_per_gram() {
        let unit = reference_unit(1000.0, -105_874.0, 100.0).unwrap();
        assert!((unit - -1068.74).abs() < 1e-3);
    }

    #[test]
    fn reference_unit_rejects_unchanged_scale_and_bad_mass() {
        assert!(reference_unit(1000.0, 1000.4, 100.0).is_err());
        assert!(reference_unit(0.0, 5000.0, 0.0).is_err());
        assert!(reference_unit(0.0, 5000.0, f32::NAN).is_err());
    }

    #[test]
    fn simulated_self_check_passes_every_device() {
        let mut cfg = Config::default();
        cfg.timing.park_ms = 1;
        let lines = self_check(&cfg, true);
        assert!(lines.iter().all(|l| l.ok), "{lines:?}");
        let names: Vec<_> = lines.iter().map(|l| l.device).collect();
        assert_eq!(names, ["servos", "light", "scale", "metal", "camera", "model"]);
        assert!(report_self_check(&lines, false).is_ok());
    }

    #[test]
    fn failed_device_fails_the_report() {
        let lines = vec![
            CheckLine::pass("scale", "0.0 g after tare"),
            CheckLine::fail("camera", "no camera"),
        ];
        let err = report_self_check(&lines, true).unwrap_err();
        assert!(err.to_string().contains("1 device(s)"));
    }

    #[test]
    fn simulated_scale_cannot_be_calibrated() {
        let cfg = Config::default();
        let mut enter = std::io::Cursor::new(b"\n".to_vec());
        let err = calibrate(&cfg, true, 100.0, 5, &mut enter, false).unwrap_err();
        assert!(err.to_string().contains("no change"));
    }

    #[test]
    fn other_label_sorts_without_motion() {
        let cfg = Config::default();
        assert!(sort(&cfg, true, Label::Other).is_ok());
    }
}
