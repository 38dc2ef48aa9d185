use sorter_traits::Illuminator;
use tracing::warn;

/// Capture illumination. A missing or failing strip never fails a scan.
pub struct Flash {
    strip: Option<Box<dyn Illuminator + Send>>,
    color: [u8; 3],
}

impl Flash {
    pub fn new(strip: Option<Box<dyn Illuminator + Send>>, color: [u8; 3]) -> Self {
        Self { strip, color }
    }

    pub fn on(&mut self) {
        self.fill(self.color);
    }

    pub fn off(&mut self) {
        self.fill([0, 0, 0]);
    }

    fn fill(&mut self, rgb: [u8; 3]) {
        if let Some(strip) = self.strip.as_mut()
            && let Err(e) = strip.fill(rgb)
        {
            warn!(error = %e, ?rgb, "light strip write failed");
        }
    }
}
