#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration parsing for the sorting kiosk.
//!
//! - `Config` and its sections are deserialized from TOML. Every section is
//!   optional and defaults to the kiosk's bench calibration.
//! - Environment overrides are applied after parsing, before `validate()`.
//! - The calibration CSV loader enforces headers and fits counts-per-gram with
//!   a single outlier-rejecting refit.
use std::path::Path;

use serde::Deserialize;

/// Calibration CSV schema.
///
/// Expected headers:
/// raw,grams
///
/// Example:
/// raw,grams
/// 842913,0.0
/// 736039,100.0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub raw: i64,
    pub grams: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerCfg {
    /// Socket address for the HTTP surface.
    pub bind: String,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RemoteCfg {
    pub base_url: String,
    pub secret: String,
    pub bin_id: String,
    pub start_timeout_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for RemoteCfg {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            secret: "default".into(),
            bin_id: "BIN_01".into(),
            start_timeout_ms: 5000,
            stop_timeout_ms: 3000,
        }
    }
}

impl RemoteCfg {
    /// Endpoint receiving START and STOP actions.
    pub fn kiosk_url(&self) -> String {
        format!("{}/api/machine/kiosk", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelCfg {
    pub path: String,
    pub input_width: u32,
    pub input_height: u32,
    /// Each RGB byte `v` is fed to the model as `v * input_scale + input_offset`.
    pub input_scale: f32,
    pub input_offset: f32,
}

impl Default for ModelCfg {
    fn default() -> Self {
        Self {
            path: "model/classifier.onnx".into(),
            input_width: 224,
            input_height: 224,
            input_scale: 1.0,
            input_offset: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CameraCfg {
    /// Device indices tried in order; -1 asks the backend for any device.
    pub candidates: Vec<i32>,
    /// Back-off after a failed frame read.
    pub retry_ms: u64,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            candidates: vec![0, 1, -1],
            retry_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    pub metal_in: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            hx711_dt: 5,
            hx711_sck: 6,
            metal_in: 26,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ScaleCfg {
    /// Raw counts per gram (sign follows the load cell wiring).
    pub reference_unit: f32,
    /// Raw reads combined per weight sample.
    pub samples: usize,
    /// Raw reads combined when zeroing.
    pub tare_samples: usize,
    /// Readings below this many grams report as zero.
    pub noise_floor_g: f32,
    /// Max time to wait for HX711 data-ready before failing a read.
    pub read_timeout_ms: u64,
}

impl Default for ScaleCfg {
    fn default() -> Self {
        Self {
            reference_unit: -1068.74,
            samples: 5,
            tare_samples: 15,
            noise_floor_g: 0.5,
            read_timeout_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MetalCfg {
    /// Sensor pulls the line low when metal is present.
    pub active_low: bool,
    pub pull_up: bool,
}

impl Default for MetalCfg {
    fn default() -> Self {
        Self {
            active_low: true,
            pull_up: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ServoCfg {
    pub i2c_bus: u8,
    pub i2c_address: u16,
    pub pwm_hz: u32,
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
    pub actuation_range_deg: f32,
    pub gate_channel: u8,
    pub slapper_channel: u8,
    pub gate_idle_deg: f32,
    /// Plastic tilts to idle + offset, cans to idle - offset.
    pub gate_offset_deg: f32,
    pub slap_rest_deg: f32,
    pub slap_hit_deg: f32,
}

impl Default for ServoCfg {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            i2c_address: 0x40,
            pwm_hz: 50,
            min_pulse_us: 500,
            max_pulse_us: 2500,
            actuation_range_deg: 180.0,
            gate_channel: 15,
            slapper_channel: 0,
            gate_idle_deg: 60.0,
            gate_offset_deg: 35.0,
            slap_rest_deg: 65.0,
            slap_hit_deg: 160.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimingCfg {
    pub gate_settle_ms: u64,
    pub slap_travel_ms: u64,
    pub slap_return_ms: u64,
    pub gate_return_ms: u64,
    pub park_ms: u64,
    pub flash_ms: u64,
    pub weigh_settle_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            gate_settle_ms: 500,
            slap_travel_ms: 600,
            slap_return_ms: 400,
            gate_return_ms: 500,
            park_ms: 500,
            flash_ms: 300,
            weigh_settle_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct FusionCfg {
    pub max_item_weight_g: f32,
}

impl Default for FusionCfg {
    fn default() -> Self {
        Self {
            max_item_weight_g: 50.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LightOrder {
    #[default]
    Rgb,
    Grb,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct LightCfg {
    pub enabled: bool,
    pub spi_bus: u8,
    pub pixels: usize,
    pub brightness: f32,
    pub flash_color: [u8; 3],
    pub order: LightOrder,
}

impl Default for LightCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            spi_bus: 0,
            pixels: 8,
            brightness: 1.0,
            flash_color: [255, 150, 255],
            order: LightOrder::Rgb,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub server: ServerCfg,
    pub remote: RemoteCfg,
    pub model: ModelCfg,
    pub camera: CameraCfg,
    pub pins: Pins,
    pub scale: ScaleCfg,
    pub metal: MetalCfg,
    pub servo: ServoCfg,
    pub timing: TimingCfg,
    pub fusion: FusionCfg,
    pub light: LightCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Environment variables honoured on top of the TOML document.
pub const ENV_OVERRIDES: [&str; 4] = ["BASE_URL", "PI_SECRET", "BIN_ID", "MODEL_PATH"];

impl Config {
    /// Read and parse `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> eyre::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => load_toml(&s).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(eyre::eyre!("read config {:?}: {}", path, e)),
        }
    }

    /// Apply `BASE_URL`, `PI_SECRET`, `BIN_ID` and `MODEL_PATH`. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("BASE_URL") {
            self.remote.base_url = v;
        }
        if let Some(v) = get("PI_SECRET") {
            self.remote.secret = v;
        }
        if let Some(v) = get("BIN_ID") {
            self.remote.bin_id = v;
        }
        if let Some(v) = get("MODEL_PATH") {
            self.model.path = v;
        }
    }

    /// Replace the scale's reference unit with a fitted calibration.
    pub fn apply_calibration(&mut self, cal: &Calibration) {
        self.scale.reference_unit = cal.reference_unit();
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Server / remote
        if self.server.bind.trim().is_empty() {
            eyre::bail!("server.bind must not be empty");
        }
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            eyre::bail!("remote.base_url must start with http:// or https://");
        }
        if self.remote.bin_id.trim().is_empty() {
            eyre::bail!("remote.bin_id must not be empty");
        }
        if self.remote.start_timeout_ms == 0 || self.remote.stop_timeout_ms == 0 {
            eyre::bail!("remote timeouts must be >= 1 ms");
        }

        // Model
        if self.model.path.trim().is_empty() {
            eyre::bail!("model.path must not be empty");
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            eyre::bail!("model input dimensions must be >= 1");
        }
        if !self.model.input_scale.is_finite() || !self.model.input_offset.is_finite() {
            eyre::bail!("model.input_scale and model.input_offset must be finite");
        }

        // Camera
        if self.camera.candidates.is_empty() {
            eyre::bail!("camera.candidates must list at least one device index");
        }

        // Scale
        if !self.scale.reference_unit.is_finite() || self.scale.reference_unit == 0.0 {
            eyre::bail!("scale.reference_unit must be finite and non-zero");
        }
        if self.scale.samples == 0 {
            eyre::bail!("scale.samples must be >= 1");
        }
        if self.scale.tare_samples == 0 {
            eyre::bail!("scale.tare_samples must be >= 1");
        }
        if !self.scale.noise_floor_g.is_finite() || self.scale.noise_floor_g < 0.0 {
            eyre::bail!("scale.noise_floor_g must be >= 0");
        }
        if self.scale.read_timeout_ms == 0 {
            eyre::bail!("scale.read_timeout_ms must be >= 1");
        }

        // Servo
        let s = &self.servo;
        if s.pwm_hz == 0 || s.pwm_hz > 1526 {
            eyre::bail!("servo.pwm_hz must be in [1, 1526]");
        }
        if s.min_pulse_us >= s.max_pulse_us {
            eyre::bail!("servo.min_pulse_us must be < servo.max_pulse_us");
        }
        if !(s.actuation_range_deg.is_finite() && s.actuation_range_deg > 0.0) {
            eyre::bail!("servo.actuation_range_deg must be > 0");
        }
        if s.gate_channel > 15 || s.slapper_channel > 15 {
            eyre::bail!("servo channels must be in [0, 15]");
        }
        if s.gate_channel == s.slapper_channel {
            eyre::bail!("servo.gate_channel and servo.slapper_channel must differ");
        }
        let in_range = |deg: f32| deg.is_finite() && (0.0..=s.actuation_range_deg).contains(&deg);
        for (name, deg) in [
            ("servo.gate_idle_deg", s.gate_idle_deg),
            ("servo.slap_rest_deg", s.slap_rest_deg),
            ("servo.slap_hit_deg", s.slap_hit_deg),
        ] {
            if !in_range(deg) {
                eyre::bail!("{name} must be within [0, {}]", s.actuation_range_deg);
            }
        }
        if !in_range(s.gate_idle_deg + s.gate_offset_deg)
            || !in_range(s.gate_idle_deg - s.gate_offset_deg)
        {
            eyre::bail!("servo.gate_offset_deg pushes the gate outside the actuation range");
        }

        // Fusion
        if !(self.fusion.max_item_weight_g.is_finite() && self.fusion.max_item_weight_g > 0.0) {
            eyre::bail!("fusion.max_item_weight_g must be > 0");
        }

        // Light
        if !(0.0..=1.0).contains(&self.light.brightness) {
            eyre::bail!("light.brightness must be in [0.0, 1.0]");
        }
        if self.light.enabled && self.light.pixels == 0 {
            eyre::bail!("light.pixels must be >= 1 when the light is enabled");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

/// Linear calibration in the form `grams = grams_per_count * (raw - zero_counts)`.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    pub zero_counts: i32,
    pub grams_per_count: f32,
}

impl Calibration {
    /// Counts per gram, the unit `scale.reference_unit` is expressed in.
    pub fn reference_unit(&self) -> f32 {
        1.0 / self.grams_per_count
    }

    /// Fit grams = a*raw + b over all rows by ordinary least squares, then refit once
    /// without residuals beyond two RMS. Raw values must be strictly monotonic.
    pub fn from_rows(rows: &[CalibrationRow]) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("calibration requires at least two rows, got {}", rows.len());
        }

        let mut dir: i8 = 0;
        for (i, pair) in rows.windows(2).enumerate() {
            let step = match pair[1].raw.cmp(&pair[0].raw) {
                std::cmp::Ordering::Greater => 1,
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => eyre::bail!(
                    "calibration rows have duplicate raw values at index {} and {}",
                    i,
                    i + 1
                ),
            };
            if dir != 0 && dir != step {
                eyre::bail!(
                    "calibration raw values must be monotonic (strictly increasing or strictly decreasing)"
                );
            }
            dir = step;
        }

        let pts: Vec<(f64, f64)> = rows
            .iter()
            .map(|r| (r.raw as f64, f64::from(r.grams)))
            .collect();
        let (a0, b0) = ols(&pts)?;

        let sumsq: f64 = pts
            .iter()
            .map(|(x, y)| {
                let r = y - (a0 * x + b0);
                r * r
            })
            .sum();
        let rms = (sumsq / pts.len() as f64).sqrt();

        let (a, b) = refit_without_outliers(&pts, a0, b0, 2.0 * rms).unwrap_or((a0, b0));
        let zero = -b / a;
        if !zero.is_finite() {
            eyre::bail!("calibration produced invalid tare baseline");
        }

        Ok(Self {
            zero_counts: zero.round() as i32,
            grams_per_count: a as f32,
        })
    }
}

fn ols(pts: &[(f64, f64)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxx, mut sxy) = (0.0f64, 0.0f64);
    for (x, y) in pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("calibration cannot determine slope (degenerate X variance)");
    }
    let a = sxy / sxx;
    if !a.is_finite() || a == 0.0 {
        eyre::bail!("calibration produced zero or non-finite slope");
    }
    Ok((a, mean_y - a * mean_x))
}

/// `None` when nothing was rejected or fewer than two inliers remain.
fn refit_without_outliers(pts: &[(f64, f64)], a0: f64, b0: f64, thr: f64) -> Option<(f64, f64)> {
    if !(thr.is_finite() && thr > 0.0) {
        return None;
    }
    let inliers: Vec<(f64, f64)> = pts
        .iter()
        .copied()
        .filter(|(x, y)| (y - (a0 * x + b0)).abs() <= thr)
        .collect();
    if inliers.len() < 2 || inliers.len() == pts.len() {
        return None;
    }
    ols(&inliers).ok()
}

pub fn load_calibration_csv(path: &Path) -> eyre::Result<Calibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != ["raw", "grams"] {
        eyre::bail!(
            "calibration CSV must have headers 'raw,grams', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }

    Calibration::from_rows(&rows)
}
