//! HX711 24-bit load cell ADC, bit-banged over a data line and a clock line.
//!
//! The protocol is generic over `Hx711Lines`; the `rppal` binding is only
//! compiled with the `hardware` feature.

use std::time::Duration;

use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::wait_until_low_with_timeout;

/// The two wires of an HX711.
pub trait Hx711Lines {
    /// DOUT level. Low means a conversion is ready.
    fn dout_high(&self) -> bool;
    fn set_sck(&mut self, high: bool);
}

/// Channel and gain of the *next* conversion, selected by the number of
/// extra clock pulses after the 24 data bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    #[default]
    A128,
    B32,
    A64,
}

impl Gain {
    pub fn extra_pulses(self) -> u8 {
        match self {
            Self::A128 => 1,
            Self::B32 => 2,
            Self::A64 => 3,
        }
    }
}

/// Interpret the low 24 bits of `raw` as two's complement.
#[inline]
pub fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

const DATA_BITS: u32 = 24;
const READY_POLL: Duration = Duration::from_micros(200);
/// SCK held high longer than 60 us powers the chip down.
const POWER_DOWN_HOLD: Duration = Duration::from_micros(100);

pub struct Hx711<L> {
    lines: L,
    gain: Gain,
}

impl<L: Hx711Lines> Hx711<L> {
    pub fn new(mut lines: L, gain: Gain) -> Self {
        lines.set_sck(false);
        Self { lines, gain }
    }

    /// Power down and back up; the first conversion after this uses gain 128.
    pub fn power_cycle(&mut self) {
        self.lines.set_sck(true);
        std::thread::sleep(POWER_DOWN_HOLD);
        self.lines.set_sck(false);
    }

    /// Wait up to `timeout` for a conversion and clock it out.
    pub fn read(&mut self, timeout: Duration) -> Result<i32> {
        let lines = &self.lines;
        wait_until_low_with_timeout(|| lines.dout_high(), timeout, READY_POLL)
            .map_err(|_| HwError::Timeout)?;

        let mut raw = 0u32;
        for _ in 0..DATA_BITS {
            self.lines.set_sck(true);
            std::hint::spin_loop();
            raw = (raw << 1) | u32::from(self.lines.dout_high());
            self.lines.set_sck(false);
            std::hint::spin_loop();
        }
        for _ in 0..self.gain.extra_pulses() {
            self.lines.set_sck(true);
            std::hint::spin_loop();
            self.lines.set_sck(false);
            std::hint::spin_loop();
        }

        let value = sign_extend_24(raw);
        trace!(raw = value, "hx711 conversion");
        Ok(value)
    }
}

#[cfg(feature = "hardware")]
pub use gpio_lines::GpioLines;

#[cfg(feature = "hardware")]
mod gpio_lines {
    use rppal::gpio::{InputPin, OutputPin};

    use super::Hx711Lines;

    pub struct GpioLines {
        pub dout: InputPin,
        pub sck: OutputPin,
    }

    impl Hx711Lines for GpioLines {
        fn dout_high(&self) -> bool {
            self.dout.is_high()
        }

        fn set_sck(&mut self, high: bool) {
            if high {
                self.sck.set_high();
            } else {
                self.sck.set_low();
            }
        }
    }
}
