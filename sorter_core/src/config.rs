//! Runtime configuration used by the core, already converted to durations and
//! plain values. See `conversions` for the mapping from `sorter_config`.

use std::time::Duration;

/// Weight sensing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightCfg {
    /// Raw counts per gram.
    pub reference_unit: f32,
    pub samples: usize,
    pub tare_samples: usize,
    pub noise_floor_g: f32,
    pub read_timeout: Duration,
}

impl Default for WeightCfg {
    fn default() -> Self {
        Self {
            reference_unit: -1068.74,
            samples: 5,
            tare_samples: 15,
            noise_floor_g: 0.5,
            read_timeout: Duration::from_millis(150),
        }
    }
}

/// Servo channels and calibrated angles of the gate and slapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoGeometry {
    pub gate_channel: u8,
    pub slapper_channel: u8,
    pub gate_idle_deg: f32,
    pub gate_offset_deg: f32,
    pub slap_rest_deg: f32,
    pub slap_hit_deg: f32,
}

impl Default for ServoGeometry {
    fn default() -> Self {
        Self {
            gate_channel: 15,
            slapper_channel: 0,
            gate_idle_deg: 60.0,
            gate_offset_deg: 35.0,
            slap_rest_deg: 65.0,
            slap_hit_deg: 160.0,
        }
    }
}

impl ServoGeometry {
    pub fn plastic_deg(&self) -> f32 {
        self.gate_idle_deg + self.gate_offset_deg
    }

    pub fn can_deg(&self) -> f32 {
        self.gate_idle_deg - self.gate_offset_deg
    }
}

/// Holds between servo moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTiming {
    pub gate_settle: Duration,
    pub slap_travel: Duration,
    pub slap_return: Duration,
    pub gate_return: Duration,
    pub park: Duration,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            gate_settle: Duration::from_millis(500),
            slap_travel: Duration::from_millis(600),
            slap_return: Duration::from_millis(400),
            gate_return: Duration::from_millis(500),
            park: Duration::from_millis(500),
        }
    }
}

/// Delays the station inserts around capture and re-weighing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationTiming {
    pub flash: Duration,
    pub weigh_settle: Duration,
}

impl Default for StationTiming {
    fn default() -> Self {
        Self {
            flash: Duration::from_millis(300),
            weigh_settle: Duration::from_millis(500),
        }
    }
}

/// Model input geometry and numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInput {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub offset: f32,
}

impl Default for ModelInput {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            scale: 1.0,
            offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraCfg {
    pub candidates: Vec<i32>,
    pub retry: Duration,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            candidates: vec![0, 1, -1],
            retry: Duration::from_millis(100),
        }
    }
}

/// Weight limit applied by the decision rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionCfg {
    pub max_item_weight_g: f32,
}

impl Default for FusionCfg {
    fn default() -> Self {
        Self {
            max_item_weight_g: crate::fusion::MAX_ITEM_WEIGHT_G,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashCfg {
    pub color: [u8; 3],
}

impl Default for FlashCfg {
    fn default() -> Self {
        Self {
            color: [255, 150, 255],
        }
    }
}
