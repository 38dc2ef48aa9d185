//! Simulated devices for running the kiosk without a Raspberry Pi.
//!
//! Each simulator exposes a cloneable handle so a test can change what the
//! "hardware" reports while the station owns the device. Left untouched, as
//! under `serve --sim`, the platform is empty and no metal is sensed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;

use sorter_traits::{DigitalInput, Frame, Illuminator, Scale, ServoDriver, VideoDevice, VideoStream};
use tracing::{debug, info};

use crate::error::HwError;

/// Scale returning whatever raw count is currently loaded on its handle.
#[derive(Clone, Default)]
pub struct SimulatedScale {
    raw: Arc<AtomicI32>,
}

impl SimulatedScale {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a load expressed in grams, using the scale's reference unit.
    pub fn load_grams(&self, grams: f32, reference_unit: f32) {
        self.raw
            .store((grams * reference_unit).round() as i32, Ordering::Relaxed);
    }
}

impl Scale for SimulatedScale {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let raw = self.raw.load(Ordering::Relaxed);
        debug!(raw, "simulated scale read");
        Ok(raw)
    }
}

/// Digital line held at a settable level.
#[derive(Clone)]
pub struct SimulatedInput {
    high: Arc<AtomicBool>,
}

impl SimulatedInput {
    pub fn new(high: bool) -> Self {
        Self {
            high: Arc::new(AtomicBool::new(high)),
        }
    }

    pub fn set_high(&self, high: bool) {
        self.high.store(high, Ordering::Relaxed);
    }
}

impl DigitalInput for SimulatedInput {
    fn is_high(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.high.load(Ordering::Relaxed))
    }
}

/// Servo driver that only logs the commanded motion.
#[derive(Debug, Default)]
pub struct SimulatedServos;

impl ServoDriver for SimulatedServos {
    fn set_angle(
        &mut self,
        channel: u8,
        degrees: f32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if channel >= 16 {
            return Err(Box::new(HwError::InvalidArgument(format!(
                "servo channel {channel} out of range"
            ))));
        }
        info!(channel, degrees, "servo move (simulated)");
        Ok(())
    }

    fn release(&mut self, channel: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(channel, "servo release (simulated)");
        Ok(())
    }
}

/// Light strip that only logs.
#[derive(Debug, Default)]
pub struct SimulatedLight;

impl Illuminator for SimulatedLight {
    fn fill(&mut self, rgb: [u8; 3]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        debug!(?rgb, "light fill (simulated)");
        Ok(())
    }
}

/// Camera that answers on one device index and streams a solid colour.
#[derive(Clone)]
pub struct SimulatedCamera {
    index: i32,
    width: u32,
    height: u32,
    frame_interval: Duration,
    bgr: Arc<std::sync::Mutex<[u8; 3]>>,
}

impl SimulatedCamera {
    pub fn new(index: i32, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            frame_interval: Duration::from_millis(33),
            bgr: Arc::new(std::sync::Mutex::new([128, 128, 128])),
        }
    }

    pub fn with_frame_interval(mut self, d: Duration) -> Self {
        self.frame_interval = d;
        self
    }

    /// Change the colour of subsequent frames.
    pub fn show(&self, bgr: [u8; 3]) {
        if let Ok(mut c) = self.bgr.lock() {
            *c = bgr;
        }
    }
}

impl VideoDevice for SimulatedCamera {
    fn open(
        &mut self,
        index: i32,
    ) -> Result<Box<dyn VideoStream + Send>, Box<dyn std::error::Error + Send + Sync>> {
        if index != self.index {
            return Err(Box::new(HwError::Camera(format!(
                "no simulated device at index {index}"
            ))));
        }
        Ok(Box::new(self.clone()))
    }
}

impl VideoStream for SimulatedCamera {
    fn read_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(self.frame_interval);
        let bgr = self.bgr.lock().map(|c| *c).unwrap_or([0, 0, 0]);
        Ok(Frame::solid(self.width, self.height, bgr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_scale_reports_loaded_grams() {
        let mut scale = SimulatedScale::new();
        scale.load_grams(10.0, -1068.74);
        let raw = scale.read(Duration::from_millis(10)).unwrap();
        assert_eq!(raw, -10687);
    }

    #[test]
    fn simulated_camera_only_opens_its_index() {
        let mut cam = SimulatedCamera::new(1, 4, 4).with_frame_interval(Duration::ZERO);
        assert!(cam.open(0).is_err());
        let mut stream = cam.open(1).unwrap();
        let frame = stream.read_frame().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 4));
    }

    #[test]
    fn simulated_servos_reject_bad_channel() {
        let mut servos = SimulatedServos;
        assert!(servos.set_angle(16, 90.0).is_err());
        assert!(servos.set_angle(15, 90.0).is_ok());
    }
}
