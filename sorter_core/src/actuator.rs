//! Two-servo dispensing mechanism: a diverter gate and an impact slapper.
//!
//! Per accepted item the sequencer walks `Idle -> Diverting -> Impacting ->
//! Returning -> Idle`:
//!
//! - Diverting: gate to the plastic side (idle + offset) or can side (idle - offset), settle
//! - Impacting: slapper to the hit angle, wait for full travel
//! - Returning: slapper to rest, settle; gate to idle, settle
//! - Idle: both channels released so the horns do not buzz between scans
//!
//! `Other` never moves anything. Without a driver every motion is skipped.

use std::sync::Arc;

use sorter_traits::{Clock, ServoDriver};
use tracing::{debug, info, warn};

use crate::config::{SequenceTiming, ServoGeometry};
use crate::error::ActuatorError;
use crate::hw_error::map_servo_error;
use crate::types::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    Idle,
    Diverting,
    Impacting,
    Returning,
}

pub struct ActuatorSequencer {
    driver: Option<Box<dyn ServoDriver + Send>>,
    geometry: ServoGeometry,
    timing: SequenceTiming,
    clock: Arc<dyn Clock + Send + Sync>,
    state: ActuatorState,
}

impl ActuatorSequencer {
    pub fn new(
        driver: Option<Box<dyn ServoDriver + Send>>,
        geometry: ServoGeometry,
        timing: SequenceTiming,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            driver,
            geometry,
            timing,
            clock,
            state: ActuatorState::Idle,
        }
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn has_driver(&self) -> bool {
        self.driver.is_some()
    }

    /// Dispense one item into the bin for `label`.
    ///
    /// On a servo failure the mechanism is parked (best-effort) and the error
    /// returned; the sequencer is always back in `Idle` afterwards.
    pub fn sort(&mut self, label: Label) -> Result<(), ActuatorError> {
        let gate_deg = match label {
            Label::Plastic => self.geometry.plastic_deg(),
            Label::Can => self.geometry.can_deg(),
            Label::Other => {
                debug!("label Other: no motion");
                return Ok(());
            }
        };
        if self.driver.is_none() {
            debug!(%label, "no servo driver attached; skipping motion");
            return Ok(());
        }

        let started = self.clock.now();
        let res = self.run_sequence(gate_deg);
        if let Err(e) = &res {
            warn!(error = %e, state = ?self.state, "servo sequence failed; parking");
            if let Err(park_err) = self.park() {
                warn!(error = %park_err, "park after failure also failed");
            }
        }
        self.state = ActuatorState::Idle;
        if res.is_ok() {
            let took = self.clock.now().saturating_duration_since(started);
            let took_ms = u64::try_from(took.as_millis()).unwrap_or(u64::MAX);
            info!(%label, gate_deg, took_ms, "item dispensed");
        }
        res
    }

    fn run_sequence(&mut self, gate_deg: f32) -> Result<(), ActuatorError> {
        let g = self.geometry;
        let t = self.timing;

        self.state = ActuatorState::Diverting;
        self.move_to(g.gate_channel, gate_deg)?;
        self.clock.sleep(t.gate_settle);

        self.state = ActuatorState::Impacting;
        self.move_to(g.slapper_channel, g.slap_hit_deg)?;
        self.clock.sleep(t.slap_travel);

        self.state = ActuatorState::Returning;
        self.move_to(g.slapper_channel, g.slap_rest_deg)?;
        self.clock.sleep(t.slap_return);
        self.move_to(g.gate_channel, g.gate_idle_deg)?;
        self.clock.sleep(t.gate_return);

        self.release_both()
    }

    /// Drive both servos to their resting pose, hold, then release.
    pub fn park(&mut self) -> Result<(), ActuatorError> {
        if self.driver.is_none() {
            return Ok(());
        }
        let g = self.geometry;
        self.move_to(g.gate_channel, g.gate_idle_deg)?;
        self.move_to(g.slapper_channel, g.slap_rest_deg)?;
        self.clock.sleep(self.timing.park);
        self.release_both()?;
        self.state = ActuatorState::Idle;
        debug!("servos parked");
        Ok(())
    }

    fn move_to(&mut self, channel: u8, degrees: f32) -> Result<(), ActuatorError> {
        if let Some(driver) = self.driver.as_mut() {
            driver
                .set_angle(channel, degrees)
                .map_err(|e| map_servo_error(channel, e.as_ref()))?;
            debug!(channel, degrees, "servo move");
        }
        Ok(())
    }

    fn release_both(&mut self) -> Result<(), ActuatorError> {
        let channels = [self.geometry.gate_channel, self.geometry.slapper_channel];
        if let Some(driver) = self.driver.as_mut() {
            for ch in channels {
                driver
                    .release(ch)
                    .map_err(|e| map_servo_error(ch, e.as_ref()))?;
            }
        }
        Ok(())
    }
}
