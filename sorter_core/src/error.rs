use thiserror::Error;

use crate::state::RunStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("sensor read failed: {0}")]
    Read(String),
    #[error("timeout waiting for sensor")]
    Timeout,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("no camera produced a frame (tried indices {tried:?})")]
    NoDevice { tried: Vec<i32> },
    #[error("camera read failed: {0}")]
    Read(String),
    #[error("camera not started")]
    NotStarted,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("preprocess failed: {0}")]
    Preprocess(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model produced no usable scores")]
    EmptyOutput,
    #[error("model load failed: {0}")]
    Model(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("servo channel {channel}: {reason}")]
    Servo { channel: u8, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("remote returned status {0}")]
    Status(u16),
    #[error("could not decode remote reply: {0}")]
    Decode(String),
}

/// Failures of a station action. A failed scan leaves the run state untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StationError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("no frame available yet")]
    NoFrame,
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
    #[error("run is not active (status {status})")]
    NotRunning { status: RunStatus },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing camera device")]
    MissingCamera,
    #[error("missing inference backend")]
    MissingBackend,
    #[error("missing kiosk api client")]
    MissingKioskApi,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
