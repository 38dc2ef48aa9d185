//! PCA9685 16-channel PWM controller driving hobby servos over I2C.

use std::time::Duration;

use rppal::i2c::I2c;
use sorter_traits::ServoDriver;
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::{PulseRange, angle_to_pulse_us, pca9685_prescale, pulse_us_to_ticks};

const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;

const MODE1_SLEEP: u8 = 0x10;
const MODE1_AUTO_INCREMENT: u8 = 0x20;
const MODE1_RESTART: u8 = 0x80;
/// Bit 4 of LEDn_OFF_H forces the output fully off.
const FULL_OFF: u8 = 0x10;

pub const CHANNELS: u8 = 16;

pub struct Pca9685Servos {
    i2c: I2c,
    pwm_hz: u32,
    range: PulseRange,
}

impl Pca9685Servos {
    pub fn open(bus: u8, address: u16, pwm_hz: u32, range: PulseRange) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(format!("open bus {bus}: {e}")))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(format!("address {address:#04x}: {e}")))?;

        let mut dev = Self { i2c, pwm_hz, range };
        dev.configure()?;
        debug!(bus, address, pwm_hz, "pca9685 ready");
        Ok(dev)
    }

    fn configure(&mut self) -> Result<()> {
        let prescale = pca9685_prescale(self.pwm_hz);
        // Prescaler can only be written while the oscillator sleeps.
        self.write_reg(MODE1, MODE1_SLEEP)?;
        self.write_reg(PRESCALE, prescale)?;
        self.write_reg(MODE1, 0x00)?;
        std::thread::sleep(Duration::from_millis(5));
        self.write_reg(MODE1, MODE1_RESTART | MODE1_AUTO_INCREMENT)?;
        Ok(())
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<()> {
        self.i2c
            .smbus_write_byte(reg, value)
            .map_err(|e| HwError::I2c(format!("write reg {reg:#04x}: {e}")))
    }

    fn write_channel(&mut self, channel: u8, regs: [u8; 4]) -> Result<()> {
        if channel >= CHANNELS {
            return Err(HwError::InvalidArgument(format!(
                "servo channel {channel} out of range"
            )));
        }
        self.i2c
            .block_write(LED0_ON_L + 4 * channel, &regs)
            .map_err(|e| HwError::I2c(format!("channel {channel}: {e}")))
    }
}

impl ServoDriver for Pca9685Servos {
    fn set_angle(
        &mut self,
        channel: u8,
        degrees: f32,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let pulse = angle_to_pulse_us(degrees, self.range);
        let off = pulse_us_to_ticks(pulse, self.pwm_hz);
        trace!(channel, degrees, pulse_us = pulse, ticks = off, "servo move");
        self.write_channel(channel, [0, 0, (off & 0xFF) as u8, (off >> 8) as u8])?;
        Ok(())
    }

    fn release(
        &mut self,
        channel: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        trace!(channel, "servo release");
        self.write_channel(channel, [0, 0, 0, FULL_OFF])?;
        Ok(())
    }
}
