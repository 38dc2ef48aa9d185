//! Human-readable error descriptions and structured JSON error formatting.

use serde_json::json;
use sorter_core::error::{
    ActuatorError, BuildError, CameraError, ClassifierError, SensorError, StationError,
};

/// The configuration could not be loaded or failed validation.
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

impl ConfigError {
    /// Flatten an eyre chain into one message.
    pub fn from_report(err: &eyre::Report) -> Self {
        Self(
            err.chain()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(": "),
        )
    }
}

/// Failure class used for exit codes and the JSON `reason` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Config,
    Camera,
    Model,
    Other,
}

impl Failure {
    pub fn of(err: &eyre::Report) -> Self {
        if err.downcast_ref::<ConfigError>().is_some() {
            return Self::Config;
        }
        if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
            return Self::Config;
        }
        if err.downcast_ref::<CameraError>().is_some()
            || matches!(
                err.downcast_ref::<StationError>(),
                Some(StationError::Camera(_) | StationError::NoFrame)
            )
        {
            return Self::Camera;
        }
        if matches!(
            err.downcast_ref::<ClassifierError>(),
            Some(ClassifierError::Model(_))
        ) || matches!(
            err.downcast_ref::<StationError>(),
            Some(StationError::Classifier(ClassifierError::Model(_)))
        ) {
            return Self::Model;
        }
        Self::Other
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Config => "Config",
            Self::Camera => "Camera",
            Self::Model => "Model",
            Self::Other => "Error",
        }
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ConfigError(msg)) = err.downcast_ref::<ConfigError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML, a bad environment override, or a malformed calibration CSV.\nHow to fix: Edit the config file (see etc/sorter.toml) and rerun `sorter self-check`."
        );
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingCamera => "What happened: No camera device was provided to the station.\nLikely causes: The capture backend failed to initialize.\nHow to fix: Build with the `camera` feature or run with --sim.".to_string(),
            BuildError::MissingBackend => "What happened: No classifier backend was provided to the station.\nLikely causes: The model failed to load.\nHow to fix: Check model.path / MODEL_PATH.".to_string(),
            BuildError::MissingKioskApi => "What happened: No kiosk API client was provided to the station.\nLikely causes: Programming error in device assembly.\nHow to fix: Report a bug.".to_string(),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    let camera = err.downcast_ref::<CameraError>().or_else(|| {
        match err.downcast_ref::<StationError>() {
            Some(StationError::Camera(c)) => Some(c),
            _ => None,
        }
    });
    if let Some(ce) = camera {
        return match ce {
            CameraError::NoDevice { tried } => format!(
                "What happened: No camera answered on indices {tried:?}.\nLikely causes: Camera unplugged, busy in another process, or missing /dev/video* permissions.\nHow to fix: Reconnect the camera, close other capture apps, or adjust camera.candidates."
            ),
            other => format!(
                "What happened: Camera failure ({other}).\nLikely causes: The capture device stopped delivering frames.\nHow to fix: Reconnect the camera and restart the run."
            ),
        };
    }

    if let Some(ClassifierError::Model(msg)) = err.downcast_ref::<ClassifierError>() {
        return format!(
            "What happened: The classification model could not be loaded ({msg}).\nLikely causes: Wrong model.path / MODEL_PATH, a corrupt file, or a build without the `onnx` feature.\nHow to fix: Point MODEL_PATH at a valid .onnx file and build with --features onnx, or run with --sim."
        );
    }

    if let Some(se) = err.downcast_ref::<SensorError>() {
        return match se {
            SensorError::Timeout => "What happened: Scale read timed out.\nLikely causes: HX711 not wired correctly, no power/ground, or timeout too low.\nHow to fix: Verify DT/SCK pins and power, and consider increasing scale.read_timeout_ms.".to_string(),
            SensorError::Read(msg) => format!(
                "What happened: Sensor read failed ({msg}).\nLikely causes: Wiring or GPIO permission problems.\nHow to fix: Check [pins] and run as a user in the gpio group."
            ),
        };
    }

    if let Some(ActuatorError::Servo { channel, reason }) = err.downcast_ref::<ActuatorError>() {
        return format!(
            "What happened: Servo on channel {channel} could not be driven ({reason}).\nLikely causes: PCA9685 not on the configured I2C bus/address, or no servo power.\nHow to fix: Check [servo] i2c_bus / i2c_address and the 5V servo supply."
        );
    }

    // String-based heuristics for errors coming from device init
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open hx711") || lower.contains("gpio") {
        return "What happened: Failed to initialize GPIO pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("bind") {
        return format!(
            "What happened: Could not listen for HTTP requests ({msg}).\nLikely causes: Port already in use or an invalid address.\nHow to fix: Stop the other process or pass --bind with a free address."
        );
    }

    if lower.contains("self-check failed") {
        return format!(
            "What happened: {msg}.\nLikely causes: See the per-device lines above.\nHow to fix: Fix the failing devices, or run with --sim to test without hardware."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: config 2, camera 3, model 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> u8 {
    match Failure::of(err) {
        Failure::Config => 2,
        Failure::Camera => 3,
        Failure::Model => 4,
        Failure::Other => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({
        "reason": Failure::of(err).name(),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
