#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core sorting logic (hardware-agnostic).
//!
//! Every device is reached through the `sorter_traits` seams, so the whole scan
//! pipeline runs unchanged against real drivers, simulators, or test spies.
//!
//! ## Pipeline
//!
//! One scan, strictly in order, under a single station-wide gate:
//!
//! 1. weight and metal sample (`weight`, `metal`)
//! 2. flash and copy the latest frame (`light`, `camera`)
//! 3. classify (`classifier`)
//! 4. reconcile label with sensors (`fusion`)
//! 5. run the servo sequence (`actuator`)
//! 6. re-weigh and record the outcome (`state`)
//!
//! Remote START/STOP reporting goes through the `report::KioskApi` seam and is
//! always best-effort.

pub mod actuator;
pub mod builder;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod conversions;
pub mod error;
pub mod fusion;
pub mod hw_error;
pub mod light;
pub mod metal;
pub mod mocks;
pub mod report;
pub mod state;
pub mod station;
pub mod types;
pub mod weight;

pub use builder::StationBuilder;
pub use error::{BuildError, StationError};
pub use fusion::decide;
pub use state::{RunState, RunStatus};
pub use station::Station;
pub use types::{ClassificationResult, Decision, Label, RejectionReason, ScanOutcome, SensorSample};
