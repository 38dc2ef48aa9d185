//! Load cell adapter: averaged raw reads, tare baseline, grams with a noise floor.

use sorter_traits::Scale;
use tracing::debug;

use crate::config::WeightCfg;
use crate::error::SensorError;
use crate::hw_error::map_sensor_error;

/// Readings below `floor` grams (or non-finite ones) become `0.0`.
#[inline]
pub fn clamp_noise(grams: f32, floor: f32) -> f32 {
    if grams.is_finite() && grams >= floor {
        grams
    } else {
        0.0
    }
}

/// Mean of the middle readings: with five or more values the top and bottom
/// fifth are dropped, with two to four the median is used.
pub fn trimmed_mean(values: &mut [f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    values.sort_by(f64::total_cmp);
    if n >= 5 {
        let cut = n / 5;
        let kept = &values[cut..n - cut];
        Some(kept.iter().sum::<f64>() / kept.len() as f64)
    } else if n % 2 == 1 {
        Some(values[n / 2])
    } else {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    }
}

pub struct WeightSensor {
    scale: Box<dyn Scale + Send>,
    cfg: WeightCfg,
    zero_counts: f64,
}

impl WeightSensor {
    pub fn new(scale: Box<dyn Scale + Send>, cfg: WeightCfg) -> Self {
        Self {
            scale,
            cfg,
            zero_counts: 0.0,
        }
    }

    pub fn zero_counts(&self) -> f64 {
        self.zero_counts
    }

    /// Robust average of `n` raw reads. Any failed read fails the whole sample.
    pub fn raw_average(&mut self, n: usize) -> Result<f64, SensorError> {
        let mut reads = Vec::with_capacity(n);
        for _ in 0..n.max(1) {
            let raw = self
                .scale
                .read(self.cfg.read_timeout)
                .map_err(|e| map_sensor_error(e.as_ref()))?;
            reads.push(f64::from(raw));
        }
        trimmed_mean(&mut reads).ok_or_else(|| SensorError::Read("no readings".into()))
    }

    /// Take the current load as the zero baseline.
    pub fn tare(&mut self) -> Result<(), SensorError> {
        self.zero_counts = self.raw_average(self.cfg.tare_samples)?;
        debug!(zero_counts = self.zero_counts, "scale tared");
        Ok(())
    }

    /// Grams above the tare baseline, clamped to zero below the noise floor.
    pub fn sample(&mut self) -> Result<f32, SensorError> {
        let avg = self.raw_average(self.cfg.samples)?;
        let grams = ((avg - self.zero_counts) / f64::from(self.cfg.reference_unit)) as f32;
        let g = clamp_noise(grams, self.cfg.noise_floor_g);
        debug!(raw = avg, grams = g, "weight sample");
        Ok(g)
    }
}
