use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use sorter_traits::Illuminator;

use crate::error::{HwError, Result};
use crate::util::{PixelOrder, encode_ws2812};

const WS2812_SPI_HZ: u32 = 2_400_000;

/// WS2812 strip driven from the SPI MOSI line.
pub struct SpiPixelStrip {
    spi: Spi,
    pixels: usize,
    brightness: f32,
    order: PixelOrder,
}

impl SpiPixelStrip {
    pub fn open(bus: u8, pixels: usize, brightness: f32, order: PixelOrder) -> Result<Self> {
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => return Err(HwError::InvalidArgument(format!("spi bus {other}"))),
        };
        let spi = Spi::new(bus, SlaveSelect::Ss0, WS2812_SPI_HZ, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(Self {
            spi,
            pixels,
            brightness,
            order,
        })
    }
}

impl Illuminator for SpiPixelStrip {
    fn fill(&mut self, rgb: [u8; 3]) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let frame = encode_ws2812(self.pixels, rgb, self.brightness, self.order);
        self.spi
            .write(&frame)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(())
    }
}
