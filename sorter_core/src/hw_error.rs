//! Maps `Box<dyn Error>` from trait boundaries to typed errors.
//!
//! The traits in `sorter_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to the core error enums, with an
//! optional feature-gated path for `sorter_hardware::HwError` downcasting.

use crate::error::{ActuatorError, CameraError, SensorError};

/// Map a sensor read failure (scale or digital input).
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> SensorError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<sorter_hardware::error::HwError>() {
            return match hw {
                sorter_hardware::error::HwError::Timeout
                | sorter_hardware::error::HwError::DataReadyTimeout => SensorError::Timeout,
                other => SensorError::Read(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        SensorError::Timeout
    } else {
        SensorError::Read(s)
    }
}

pub fn map_camera_error(e: &(dyn std::error::Error + 'static)) -> CameraError {
    CameraError::Read(e.to_string())
}

pub fn map_servo_error(channel: u8, e: &(dyn std::error::Error + 'static)) -> ActuatorError {
    ActuatorError::Servo {
        channel,
        reason: e.to_string(),
    }
}
