use std::time::{Duration, Instant};

/// A decoded 8-bit colour image in BGR channel order, as video devices
/// deliver it.
///
/// Construction validates the buffer length, so a `Frame` is always correctly
/// shaped for preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    bgr: Vec<u8>,
    captured_at: Instant,
}

impl Frame {
    /// Wrap a packed BGR buffer. Returns `None` when the dimensions are zero or
    /// the buffer length is not `width * height * 3`.
    pub fn from_bgr(width: u32, height: u32, bgr: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        if width == 0 || height == 0 || bgr.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            bgr,
            captured_at: Instant::now(),
        })
    }

    /// Uniformly coloured frame, handy for simulators.
    pub fn solid(width: u32, height: u32, bgr: [u8; 3]) -> Option<Self> {
        let px = (width as usize).checked_mul(height as usize)?;
        let buf = bgr.iter().copied().cycle().take(px.checked_mul(3)?).collect();
        Self::from_bgr(width, height, buf)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bgr(&self) -> &[u8] {
        &self.bgr
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}
