//! Scan orchestration and run lifecycle.
//!
//! The `Station` owns every adapter. All physical actions (start, scan, stop,
//! reset, shutdown) take the rig mutex for their whole duration, so scans run
//! at most one at a time end to end and never overlap a start or stop.

use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use sorter_traits::Clock;
use tracing::{debug, error, info, warn};

use crate::actuator::ActuatorSequencer;
use crate::camera::Camera;
use crate::classifier::Classifier;
use crate::config::{FusionCfg, StationTiming};
use crate::error::StationError;
use crate::light::Flash;
use crate::metal::MetalDetector;
use crate::report::{KioskApi, SessionGrant, StopReport, resolve_grant};
use crate::state::{RunState, RunStatus};
use crate::types::{ScanOutcome, SensorSample};
use crate::weight::WeightSensor;

/// Devices touched by a scan. Guarded as a unit by the station's scan gate.
pub(crate) struct Rig {
    pub(crate) weight: Option<WeightSensor>,
    pub(crate) metal: Option<MetalDetector>,
    pub(crate) actuator: ActuatorSequencer,
    pub(crate) flash: Flash,
    pub(crate) camera: Camera,
}

impl Rig {
    /// Grams on the platform; a failed or missing scale reads as 0 g.
    fn weigh(&mut self) -> f32 {
        match self.weight.as_mut().map(WeightSensor::sample) {
            Some(Ok(g)) => g,
            Some(Err(e)) => {
                warn!(error = %e, "weight read failed; using 0 g");
                0.0
            }
            None => 0.0,
        }
    }

    /// A failed or missing metal sensor reads as "no metal".
    fn metal(&mut self) -> bool {
        match self.metal.as_mut().map(MetalDetector::is_metal_present) {
            Some(Ok(m)) => m,
            Some(Err(e)) => {
                warn!(error = %e, "metal read failed; assuming no metal");
                false
            }
            None => false,
        }
    }
}

pub struct Station {
    pub(crate) rig: Mutex<Rig>,
    pub(crate) classifier: Classifier,
    pub(crate) state: Mutex<RunState>,
    pub(crate) api: Box<dyn KioskApi + Send + Sync>,
    pub(crate) fusion: FusionCfg,
    pub(crate) timing: StationTiming,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
}

impl Station {
    pub fn builder() -> crate::builder::StationBuilder<
        crate::builder::Missing,
        crate::builder::Missing,
        crate::builder::Missing,
    > {
        crate::builder::StationBuilder::default()
    }

    /// Begin a run: camera up, scale re-tared, transaction obtained (or made
    /// up offline), counters zeroed. Fails only when no camera can be started,
    /// in which case the state is unchanged.
    pub fn start(&self) -> Result<SessionGrant, StationError> {
        let mut rig = self.rig.lock();
        let index = rig.camera.ensure_running()?;
        debug!(index, "camera ready");

        if let Some(w) = rig.weight.as_mut()
            && let Err(e) = w.tare()
        {
            warn!(error = %e, "tare failed; keeping previous baseline");
        }

        let grant = resolve_grant(self.api.start_session(), SystemTime::now());
        self.state
            .lock()
            .begin(grant.transaction_id.clone(), grant.claim_secret.clone());
        info!(transaction_id = %grant.transaction_id, "run started");
        Ok(grant)
    }

    /// One full scan cycle. On error the run state is not modified.
    pub fn scan(&self) -> Result<ScanOutcome, StationError> {
        let mut rig = self.rig.lock();
        self.scan_locked(&mut rig).inspect_err(|e| {
            error!(error = %e, "scan failed");
        })
    }

    fn scan_locked(&self, rig: &mut Rig) -> Result<ScanOutcome, StationError> {
        let status = self.state.lock().status;
        if status != RunStatus::Running {
            return Err(StationError::NotRunning { status });
        }

        let before = SensorSample {
            weight_g: rig.weigh(),
            metal_present: rig.metal(),
        };
        debug!(weight_g = before.weight_g, metal = before.metal_present, "sensors sampled");

        rig.flash.on();
        self.clock.sleep(self.timing.flash);
        let frame = rig.camera.latest();
        rig.flash.off();
        let frame = frame?.ok_or(StationError::NoFrame)?;

        let result = self.classifier.classify(&frame)?;
        let decision = self
            .fusion
            .decide(before.weight_g, before.metal_present, result.label);
        info!(
            label = %decision.final_label,
            predicted = %result.label,
            reason = ?decision.rejection,
            weight_g = before.weight_g,
            metal = before.metal_present,
            "decision"
        );

        rig.actuator.sort(decision.final_label)?;

        self.clock.sleep(self.timing.weigh_settle);
        let after = rig.weigh();
        let outcome = ScanOutcome {
            label: decision.final_label,
            item_weight_g: (before.weight_g - after).abs(),
        };

        self.state.lock().record(&outcome);
        info!(label = %outcome.label, weight_g = outcome.item_weight_g, "scan complete");
        Ok(outcome)
    }

    /// Freeze the run and report tallies (best-effort). Returns the frozen
    /// state, or `None` when no run was in progress; then nothing is reported.
    pub fn stop(&self) -> Option<RunState> {
        let _gate = self.rig.lock();
        let snapshot = {
            let mut st = self.state.lock();
            if st.status != RunStatus::Running {
                debug!(status = %st.status, "stop ignored; no run in progress");
                return None;
            }
            st.freeze();
            st.clone()
        };

        match &snapshot.transaction_id {
            Some(tx) => {
                let report = StopReport {
                    transaction_id: tx.clone(),
                    plastic: snapshot.plastic_count,
                    cans: snapshot.can_count,
                    other: snapshot.other_count,
                    total_weight: snapshot.total_weight_g,
                };
                if let Err(e) = self.api.report_stop(&report) {
                    warn!(error = %e, transaction_id = %tx, "kiosk STOP report failed");
                }
            }
            None => debug!("stop without a transaction; nothing to report"),
        }
        info!(
            plastic = snapshot.plastic_count,
            cans = snapshot.can_count,
            other = snapshot.other_count,
            total_weight_g = snapshot.total_weight_g,
            "run stopped"
        );
        Some(snapshot)
    }

    pub fn reset(&self) {
        let _gate = self.rig.lock();
        self.state.lock().reset();
        debug!("station reset to idle");
    }

    pub fn state(&self) -> RunState {
        self.state.lock().clone()
    }

    /// Move the servos to their resting pose and release them (best-effort).
    pub fn park(&self) {
        if let Err(e) = self.rig.lock().actuator.park() {
            warn!(error = %e, "servo park failed");
        }
    }

    /// Stop the camera thread, switch the light off and park the mechanism.
    pub fn shutdown(&self) {
        let mut rig = self.rig.lock();
        rig.camera.stop();
        rig.flash.off();
        if let Err(e) = rig.actuator.park() {
            warn!(error = %e, "servo park on shutdown failed");
        }
        info!("station shut down");
    }
}
