use rppal::gpio::{Gpio, InputPin};
use sorter_traits::DigitalInput;

use crate::error::{HwError, Result};

/// A GPIO line configured as input, optionally with the internal pull-up.
pub struct GpioInput {
    pin: InputPin,
}

impl GpioInput {
    pub fn open(bcm_pin: u8, pull_up: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| HwError::Gpio(format!("pin {bcm_pin}: {e}")))?;
        let pin = if pull_up {
            pin.into_input_pullup()
        } else {
            pin.into_input()
        };
        Ok(Self { pin })
    }
}

impl DigitalInput for GpioInput {
    fn is_high(&mut self) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.pin.is_high())
    }
}
