use sorter_traits::DigitalInput;
use tracing::debug;

use crate::error::SensorError;
use crate::hw_error::map_sensor_error;

/// Inductive proximity sensor on one digital line.
pub struct MetalDetector {
    input: Box<dyn DigitalInput + Send>,
    active_low: bool,
}

impl MetalDetector {
    pub fn new(input: Box<dyn DigitalInput + Send>, active_low: bool) -> Self {
        Self { input, active_low }
    }

    pub fn is_metal_present(&mut self) -> Result<bool, SensorError> {
        let high = self
            .input
            .is_high()
            .map_err(|e| map_sensor_error(e.as_ref()))?;
        let present = high != self.active_low;
        debug!(high, present, "metal sensor read");
        Ok(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::StaticInput;

    #[test]
    fn active_low_inverts_line() {
        let mut d = MetalDetector::new(Box::new(StaticInput::new(false)), true);
        assert!(d.is_metal_present().unwrap());
        let mut d = MetalDetector::new(Box::new(StaticInput::new(true)), true);
        assert!(!d.is_metal_present().unwrap());
    }

    #[test]
    fn active_high_passes_through() {
        let mut d = MetalDetector::new(Box::new(StaticInput::new(true)), false);
        assert!(d.is_metal_present().unwrap());
    }
}
