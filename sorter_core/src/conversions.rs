//! `From` implementations bridging `sorter_config` types to `sorter_core` types.

use std::time::Duration;

use crate::config::{
    CameraCfg, FlashCfg, FusionCfg, ModelInput, SequenceTiming, ServoGeometry, StationTiming,
    WeightCfg,
};

// ── WeightCfg ────────────────────────────────────────────────────────────────

impl From<&sorter_config::ScaleCfg> for WeightCfg {
    fn from(c: &sorter_config::ScaleCfg) -> Self {
        Self {
            reference_unit: c.reference_unit,
            samples: c.samples,
            tare_samples: c.tare_samples,
            noise_floor_g: c.noise_floor_g,
            read_timeout: Duration::from_millis(c.read_timeout_ms),
        }
    }
}

// ── Servo geometry / timing ──────────────────────────────────────────────────

impl From<&sorter_config::ServoCfg> for ServoGeometry {
    fn from(c: &sorter_config::ServoCfg) -> Self {
        Self {
            gate_channel: c.gate_channel,
            slapper_channel: c.slapper_channel,
            gate_idle_deg: c.gate_idle_deg,
            gate_offset_deg: c.gate_offset_deg,
            slap_rest_deg: c.slap_rest_deg,
            slap_hit_deg: c.slap_hit_deg,
        }
    }
}

impl From<&sorter_config::TimingCfg> for SequenceTiming {
    fn from(c: &sorter_config::TimingCfg) -> Self {
        Self {
            gate_settle: Duration::from_millis(c.gate_settle_ms),
            slap_travel: Duration::from_millis(c.slap_travel_ms),
            slap_return: Duration::from_millis(c.slap_return_ms),
            gate_return: Duration::from_millis(c.gate_return_ms),
            park: Duration::from_millis(c.park_ms),
        }
    }
}

impl From<&sorter_config::TimingCfg> for StationTiming {
    fn from(c: &sorter_config::TimingCfg) -> Self {
        Self {
            flash: Duration::from_millis(c.flash_ms),
            weigh_settle: Duration::from_millis(c.weigh_settle_ms),
        }
    }
}

// ── Vision ───────────────────────────────────────────────────────────────────

impl From<&sorter_config::ModelCfg> for ModelInput {
    fn from(c: &sorter_config::ModelCfg) -> Self {
        Self {
            width: c.input_width,
            height: c.input_height,
            scale: c.input_scale,
            offset: c.input_offset,
        }
    }
}

impl From<&sorter_config::CameraCfg> for CameraCfg {
    fn from(c: &sorter_config::CameraCfg) -> Self {
        Self {
            candidates: c.candidates.clone(),
            retry: Duration::from_millis(c.retry_ms),
        }
    }
}

// ── Fusion / light ───────────────────────────────────────────────────────────

impl From<&sorter_config::FusionCfg> for FusionCfg {
    fn from(c: &sorter_config::FusionCfg) -> Self {
        Self {
            max_item_weight_g: c.max_item_weight_g,
        }
    }
}

impl From<&sorter_config::LightCfg> for FlashCfg {
    fn from(c: &sorter_config::LightCfg) -> Self {
        Self {
            color: c.flash_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_agree_across_crates() {
        let file = sorter_config::Config::default();
        assert_eq!(WeightCfg::from(&file.scale), WeightCfg::default());
        assert_eq!(ServoGeometry::from(&file.servo), ServoGeometry::default());
        assert_eq!(SequenceTiming::from(&file.timing), SequenceTiming::default());
        assert_eq!(StationTiming::from(&file.timing), StationTiming::default());
        assert_eq!(ModelInput::from(&file.model), ModelInput::default());
        assert_eq!(CameraCfg::from(&file.camera), CameraCfg::default());
        assert_eq!(FusionCfg::from(&file.fusion), FusionCfg::default());
        assert_eq!(FlashCfg::from(&file.light), FlashCfg::default());
    }
}
