//! Hardware seams shared by the sorter crates.
//!
//! Every device the station touches is reached through one of these traits so
//! the pipeline in `sorter_core` can run against real drivers, simulators, or
//! test spies without change.

pub mod clock;
pub mod frame;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use frame::Frame;

/// Load cell front-end returning raw ADC counts.
pub trait Scale {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
}

/// A single digital input line.
pub trait DigitalInput {
    /// `true` when the line currently reads high.
    fn is_high(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// Multi-channel hobby servo driver (angles in degrees).
pub trait ServoDriver {
    fn set_angle(
        &mut self,
        channel: u8,
        degrees: f32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Stop emitting pulses on `channel` so the horn holds no torque.
    fn release(&mut self, channel: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Light strip used to illuminate the capture area.
pub trait Illuminator {
    fn fill(&mut self, rgb: [u8; 3]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Opens video streams by device index.
pub trait VideoDevice {
    fn open(
        &mut self,
        index: i32,
    ) -> Result<Box<dyn VideoStream + Send>, Box<dyn std::error::Error + Send + Sync>>;
}

/// An opened video stream. `read_frame` blocks for at most one frame period.
pub trait VideoStream {
    /// `Ok(None)` means the device is open but produced no frame this time.
    fn read_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>>;
}

// Boxed devices forward to their contents so assembled rigs can pass
// `Box<dyn Trait + Send>` wherever an `impl Trait` is expected.

impl<T: Scale + ?Sized> Scale for Box<T> {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn is_high(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).is_high()
    }
}

impl<T: ServoDriver + ?Sized> ServoDriver for Box<T> {
    fn set_angle(
        &mut self,
        channel: u8,
        degrees: f32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_angle(channel, degrees)
    }

    fn release(&mut self, channel: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).release(channel)
    }
}

impl<T: Illuminator + ?Sized> Illuminator for Box<T> {
    fn fill(&mut self, rgb: [u8; 3]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).fill(rgb)
    }
}

impl<T: VideoDevice + ?Sized> VideoDevice for Box<T> {
    fn open(
        &mut self,
        index: i32,
    ) -> Result<Box<dyn VideoStream + Send>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).open(index)
    }
}
