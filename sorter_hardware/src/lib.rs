//! Device drivers and simulators for the sorting station.
//!
//! Real drivers are compiled only with the `hardware` feature (Raspberry Pi,
//! via `rppal`) and the `camera` feature (V4L2 via OpenCV). Simulators are
//! always available.

pub mod error;
pub mod hx711;
pub mod sim;
pub mod util;

#[cfg(feature = "camera")]
pub mod capture;
#[cfg(feature = "hardware")]
pub mod gpio;
#[cfg(feature = "hardware")]
pub mod pca9685;
#[cfg(feature = "hardware")]
pub mod ws2812;

pub use sim::{SimulatedCamera, SimulatedInput, SimulatedLight, SimulatedScale, SimulatedServos};

#[cfg(feature = "hardware")]
pub use hardware::HardwareScale;

#[cfg(feature = "hardware")]
mod hardware {
    use rppal::gpio::Gpio;
    use sorter_traits::Scale;

    use crate::error::HwError;
    use crate::hx711::{Gain, GpioLines, Hx711};

    /// HX711 load cell amplifier on two GPIO lines.
    pub struct HardwareScale {
        hx711: Hx711<GpioLines>,
    }

    impl HardwareScale {
        pub fn try_new(dt_pin: u8, sck_pin: u8) -> crate::error::Result<Self> {
            let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
            let dt = gpio
                .get(dt_pin)
                .map_err(|e| HwError::Gpio(format!("open hx711 dt pin {dt_pin}: {e}")))?
                .into_input();
            let sck = gpio
                .get(sck_pin)
                .map_err(|e| HwError::Gpio(format!("open hx711 sck pin {sck_pin}: {e}")))?
                .into_output();
            let mut hx711 = Hx711::new(GpioLines { dout: dt, sck }, Gain::A128);
            hx711.power_cycle();
            Ok(Self { hx711 })
        }
    }

    /// Extra attempts after a data-ready timeout before giving up.
    const TIMEOUT_RETRIES: u32 = 3;

    impl Scale for HardwareScale {
        fn read(
            &mut self,
            timeout: std::time::Duration,
        ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
            for attempt in 0..=TIMEOUT_RETRIES {
                match self.hx711.read(timeout) {
                    Ok(raw) => return Ok(raw),
                    Err(HwError::Timeout) => tracing::debug!(attempt, "hx711 not ready"),
                    Err(e) => {
                        tracing::warn!(error = %e, "hx711 read failed");
                        return Err(Box::new(e));
                    }
                }
            }
            tracing::warn!(retries = TIMEOUT_RETRIES, "hx711 timed out");
            Err(Box::new(HwError::Timeout))
        }
    }
}
