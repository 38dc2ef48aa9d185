use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate becomes false (i.e., line goes low),
/// or a timeout expires. Sleeps in small intervals to avoid CPU spinning.
pub fn wait_until_low_with_timeout(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_high() {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// PCA9685 internal oscillator frequency.
pub const PCA9685_OSC_HZ: f32 = 25_000_000.0;
/// PCA9685 PWM resolution (ticks per period).
pub const PCA9685_STEPS: u32 = 4096;

/// Servo pulse geometry: `min_pulse_us` at 0 degrees, `max_pulse_us` at `range_deg`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseRange {
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
    pub range_deg: f32,
}

impl Default for PulseRange {
    fn default() -> Self {
        Self {
            min_pulse_us: 500,
            max_pulse_us: 2500,
            range_deg: 180.0,
        }
    }
}

/// Map an angle to a pulse width, clamping the angle into `[0, range_deg]`.
pub fn angle_to_pulse_us(degrees: f32, range: PulseRange) -> f32 {
    let span = range.max_pulse_us.saturating_sub(range.min_pulse_us) as f32;
    let deg = if degrees.is_finite() {
        degrees.clamp(0.0, range.range_deg)
    } else {
        0.0
    };
    range.min_pulse_us as f32 + span * deg / range.range_deg
}

/// Convert a pulse width to PCA9685 "off" ticks for the given PWM frequency.
pub fn pulse_us_to_ticks(pulse_us: f32, pwm_hz: u32) -> u16 {
    let period_us = 1_000_000.0 / pwm_hz.max(1) as f32;
    let ticks = (pulse_us / period_us * PCA9685_STEPS as f32).round();
    ticks.clamp(0.0, (PCA9685_STEPS - 1) as f32) as u16
}

/// PCA9685 prescaler for a target PWM frequency.
pub fn pca9685_prescale(pwm_hz: u32) -> u8 {
    let raw = (PCA9685_OSC_HZ / (PCA9685_STEPS as f32 * pwm_hz.max(1) as f32)).round() - 1.0;
    raw.clamp(3.0, 255.0) as u8
}

/// Colour byte order expected by an LED strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelOrder {
    #[default]
    Rgb,
    Grb,
}

/// Trailing zero bytes that hold the line low long enough to latch (>50 us at 2.4 MHz).
pub const WS2812_LATCH_BYTES: usize = 30;

/// Encode a uniform colour for `pixels` WS2812 LEDs as an SPI bitstream clocked
/// at 2.4 MHz: each data bit becomes three line bits (`1` -> `110`, `0` -> `100`).
pub fn encode_ws2812(pixels: usize, rgb: [u8; 3], brightness: f32, order: PixelOrder) -> Vec<u8> {
    let scale = if brightness.is_finite() {
        brightness.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dim = |c: u8| (c as f32 * scale).round() as u8;
    let [r, g, b] = rgb.map(dim);
    let wire = match order {
        PixelOrder::Rgb => [r, g, b],
        PixelOrder::Grb => [g, r, b],
    };

    let mut out = Vec::with_capacity(pixels * 9 + WS2812_LATCH_BYTES);
    for _ in 0..pixels {
        for byte in wire {
            let mut bits: u32 = 0;
            for i in (0..8).rev() {
                let pattern = if byte & (1 << i) != 0 { 0b110 } else { 0b100 };
                bits = (bits << 3) | pattern;
            }
            out.extend_from_slice(&[(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]);
        }
    }
    out.extend(std::iter::repeat_n(0u8, WS2812_LATCH_BYTES));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_endpoints_and_midpoint() {
        let r = PulseRange::default();
        assert_eq!(angle_to_pulse_us(0.0, r), 500.0);
        assert_eq!(angle_to_pulse_us(180.0, r), 2500.0);
        assert_eq!(angle_to_pulse_us(90.0, r), 1500.0);
    }

    #[test]
    fn pulse_clamps_out_of_range_angles() {
        let r = PulseRange::default();
        assert_eq!(angle_to_pulse_us(-20.0, r), 500.0);
        assert_eq!(angle_to_pulse_us(400.0, r), 2500.0);
        assert_eq!(angle_to_pulse_us(f32::NAN, r), 500.0);
    }

    #[test]
    fn ticks_at_fifty_hz() {
        // 20 ms period: 1.5 ms is 7.5 % of 4096
        assert_eq!(pulse_us_to_ticks(1500.0, 50), 307);
        assert_eq!(pulse_us_to_ticks(0.0, 50), 0);
        assert_eq!(pulse_us_to_ticks(1_000_000.0, 50), 4095);
    }

    #[test]
    fn prescale_for_fifty_hz() {
        assert_eq!(pca9685_prescale(50), 121);
    }

    #[test]
    fn ws2812_encodes_bits_and_latch() {
        let out = encode_ws2812(1, [0xFF, 0x00, 0x00], 1.0, PixelOrder::Rgb);
        assert_eq!(out.len(), 9 + WS2812_LATCH_BYTES);
        // 0xFF -> 110 x8 = 0xDB 0x6D 0xB6
        assert_eq!(&out[0..3], &[0xDB, 0x6D, 0xB6]);
        // 0x00 -> 100 x8 = 0x92 0x49 0x24
        assert_eq!(&out[3..6], &[0x92, 0x49, 0x24]);
        assert!(out[9..].iter().all(|b| *b == 0));
    }

    #[test]
    fn ws2812_grb_swaps_first_two_channels() {
        let rgb = encode_ws2812(1, [0xFF, 0x00, 0x00], 1.0, PixelOrder::Rgb);
        let grb = encode_ws2812(1, [0xFF, 0x00, 0x00], 1.0, PixelOrder::Grb);
        assert_eq!(&rgb[0..3], &grb[3..6]);
    }

    #[test]
    fn ws2812_zero_brightness_is_dark() {
        let out = encode_ws2812(2, [255, 150, 255], 0.0, PixelOrder::Rgb);
        let dark = encode_ws2812(2, [0, 0, 0], 1.0, PixelOrder::Rgb);
        assert_eq!(out, dark);
    }
}
