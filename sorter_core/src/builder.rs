//! Type-state builder for `Station`.
//!
//! The camera device, inference backend and kiosk API client must be provided
//! before `build()` is available. Scale, metal input, servos and light are
//! optional: a station without them degrades to safe defaults. `try_build()`
//! is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use sorter_traits::clock::{Clock, MonotonicClock};
use sorter_traits::{DigitalInput, Illuminator, Scale, ServoDriver, VideoDevice};

use crate::actuator::ActuatorSequencer;
use crate::camera::Camera;
use crate::classifier::{Classifier, InferenceBackend};
use crate::config::{
    CameraCfg, FlashCfg, FusionCfg, ModelInput, SequenceTiming, ServoGeometry, StationTiming,
    WeightCfg,
};
use crate::error::BuildError;
use crate::light::Flash;
use crate::metal::MetalDetector;
use crate::report::KioskApi;
use crate::state::RunState;
use crate::station::{Rig, Station};
use crate::weight::WeightSensor;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

#[derive(Default)]
struct Parts {
    scale: Option<Box<dyn Scale + Send>>,
    metal_input: Option<Box<dyn DigitalInput + Send>>,
    servos: Option<Box<dyn ServoDriver + Send>>,
    light: Option<Box<dyn Illuminator + Send>>,
    camera: Option<Box<dyn VideoDevice + Send>>,
    backend: Option<Box<dyn InferenceBackend + Send>>,
    api: Option<Box<dyn KioskApi + Send + Sync>>,
    weight: WeightCfg,
    metal_active_low: Option<bool>,
    geometry: ServoGeometry,
    sequence: SequenceTiming,
    timing: StationTiming,
    model: ModelInput,
    camera_cfg: CameraCfg,
    fusion: FusionCfg,
    flash: FlashCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

/// Builder for `Station`. Configuration is validated on `build()`.
pub struct StationBuilder<C, B, A> {
    parts: Parts,
    _c: PhantomData<C>,
    _b: PhantomData<B>,
    _a: PhantomData<A>,
}

impl Default for StationBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            parts: Parts::default(),
            _c: PhantomData,
            _b: PhantomData,
            _a: PhantomData,
        }
    }
}

impl<C, B, A> StationBuilder<C, B, A> {
    fn retag<C2, B2, A2>(self) -> StationBuilder<C2, B2, A2> {
        StationBuilder {
            parts: self.parts,
            _c: PhantomData,
            _b: PhantomData,
            _a: PhantomData,
        }
    }

    /// Fallible build available in any type-state.
    ///
    /// Parks the servos before returning so the mechanism starts from a known pose.
    pub fn try_build(self) -> Result<Station, BuildError> {
        let p = self.parts;
        let camera = p.camera.ok_or(BuildError::MissingCamera)?;
        let backend = p.backend.ok_or(BuildError::MissingBackend)?;
        let api = p.api.ok_or(BuildError::MissingKioskApi)?;

        if p.weight.samples == 0 || p.weight.tare_samples == 0 {
            return Err(BuildError::InvalidConfig("weight sample counts must be >= 1"));
        }
        if !p.weight.reference_unit.is_finite() || p.weight.reference_unit == 0.0 {
            return Err(BuildError::InvalidConfig(
                "reference unit must be finite and non-zero",
            ));
        }
        if p.camera_cfg.candidates.is_empty() {
            return Err(BuildError::InvalidConfig("no camera candidates"));
        }
        if p.model.width == 0 || p.model.height == 0 {
            return Err(BuildError::InvalidConfig("model input has zero size"));
        }
        if !(p.fusion.max_item_weight_g.is_finite() && p.fusion.max_item_weight_g > 0.0) {
            return Err(BuildError::InvalidConfig("weight limit must be > 0"));
        }
        if p.geometry.gate_channel == p.geometry.slapper_channel {
            return Err(BuildError::InvalidConfig(
                "gate and slapper must use different channels",
            ));
        }

        let clock: Arc<dyn Clock + Send + Sync> =
            p.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let rig = Rig {
            weight: p.scale.map(|s| WeightSensor::new(s, p.weight)),
            metal: p
                .metal_input
                .map(|i| MetalDetector::new(i, p.metal_active_low.unwrap_or(true))),
            actuator: ActuatorSequencer::new(p.servos, p.geometry, p.sequence, clock.clone()),
            flash: Flash::new(p.light, p.flash.color),
            camera: Camera::new(camera, p.camera_cfg),
        };

        let station = Station {
            rig: Mutex::new(rig),
            classifier: Classifier::new(backend, p.model),
            state: Mutex::new(RunState::default()),
            api,
            fusion: p.fusion,
            timing: p.timing,
            clock,
        };
        station.park();
        Ok(station)
    }
}

/// Chainable setters that do not affect type-state.
impl<C, B, A> StationBuilder<C, B, A> {
    pub fn with_scale(mut self, scale: impl Scale + Send + 'static) -> Self {
        self.parts.scale = Some(Box::new(scale));
        self
    }
    pub fn with_metal_input(mut self, input: impl DigitalInput + Send + 'static) -> Self {
        self.parts.metal_input = Some(Box::new(input));
        self
    }
    pub fn with_servos(mut self, driver: impl ServoDriver + Send + 'static) -> Self {
        self.parts.servos = Some(Box::new(driver));
        self
    }
    pub fn with_light(mut self, strip: impl Illuminator + Send + 'static) -> Self {
        self.parts.light = Some(Box::new(strip));
        self
    }
    pub fn with_weight_cfg(mut self, cfg: WeightCfg) -> Self {
        self.parts.weight = cfg;
        self
    }
    /// Whether the metal sensor pulls its line low on detection (default true).
    pub fn with_metal_active_low(mut self, active_low: bool) -> Self {
        self.parts.metal_active_low = Some(active_low);
        self
    }
    pub fn with_servo_geometry(mut self, geometry: ServoGeometry) -> Self {
        self.parts.geometry = geometry;
        self
    }
    pub fn with_sequence_timing(mut self, timing: SequenceTiming) -> Self {
        self.parts.sequence = timing;
        self
    }
    pub fn with_station_timing(mut self, timing: StationTiming) -> Self {
        self.parts.timing = timing;
        self
    }
    pub fn with_model_input(mut self, model: ModelInput) -> Self {
        self.parts.model = model;
        self
    }
    pub fn with_camera_cfg(mut self, cfg: CameraCfg) -> Self {
        self.parts.camera_cfg = cfg;
        self
    }
    pub fn with_fusion(mut self, fusion: FusionCfg) -> Self {
        self.parts.fusion = fusion;
        self
    }
    pub fn with_flash(mut self, flash: FlashCfg) -> Self {
        self.parts.flash = flash;
        self
    }
    /// Take every tunable from a loaded config file.
    pub fn with_config(self, cfg: &sorter_config::Config) -> Self {
        self.with_weight_cfg((&cfg.scale).into())
            .with_metal_active_low(cfg.metal.active_low)
            .with_servo_geometry((&cfg.servo).into())
            .with_sequence_timing((&cfg.timing).into())
            .with_station_timing((&cfg.timing).into())
            .with_model_input((&cfg.model).into())
            .with_camera_cfg((&cfg.camera).into())
            .with_fusion((&cfg.fusion).into())
            .with_flash((&cfg.light).into())
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.parts.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<B, A> StationBuilder<Missing, B, A> {
    pub fn with_camera(
        mut self,
        device: impl VideoDevice + Send + 'static,
    ) -> StationBuilder<Set, B, A> {
        self.parts.camera = Some(Box::new(device));
        self.retag()
    }
}

impl<C, A> StationBuilder<C, Missing, A> {
    pub fn with_backend(
        mut self,
        backend: impl InferenceBackend + Send + 'static,
    ) -> StationBuilder<C, Set, A> {
        self.parts.backend = Some(Box::new(backend));
        self.retag()
    }
}

impl<C, B> StationBuilder<C, B, Missing> {
    pub fn with_kiosk_api(
        mut self,
        api: impl KioskApi + Send + Sync + 'static,
    ) -> StationBuilder<C, B, Set> {
        self.parts.api = Some(Box::new(api));
        self.retag()
    }
}

impl StationBuilder<Set, Set, Set> {
    /// Validate and build. Only available once camera, backend and API are set.
    pub fn build(self) -> Result<Station, BuildError> {
        self.try_build()
    }
}
