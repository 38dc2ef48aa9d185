//! Device assembly: real peripherals when built with `hardware`/`camera`,
//! simulators otherwise or with `--sim`.
//!
//! A peripheral that fails to open is logged, recorded as a fault and left
//! out; the station then degrades the way the core does for missing devices.

use sorter_config::Config;
use sorter_core::Station;
use sorter_core::classifier::InferenceBackend;
use sorter_core::config::ModelInput;
use sorter_core::error::ClassifierError;
use sorter_core::report::KioskApi;
use sorter_hardware::{SimulatedCamera, SimulatedInput, SimulatedLight, SimulatedScale, SimulatedServos};
use sorter_traits::{DigitalInput, Illuminator, Scale, ServoDriver, VideoDevice, VideoStream};
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const SIM_FRAME_WIDTH: u32 = 640;
const SIM_FRAME_HEIGHT: u32 = 480;

/// A peripheral that could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFault {
    pub device: &'static str,
    pub error: String,
}

pub struct Devices {
    pub scale: Option<Box<dyn Scale + Send>>,
    pub metal: Option<Box<dyn DigitalInput + Send>>,
    pub servos: Option<Box<dyn ServoDriver + Send>>,
    pub light: Option<Box<dyn Illuminator + Send>>,
    pub camera: Box<dyn VideoDevice + Send>,
    pub faults: Vec<DeviceFault>,
}

impl Devices {
    pub fn open(cfg: &Config, sim: bool) -> Self {
        if sim {
            return Self::simulated(cfg);
        }
        Self::hardware(cfg)
    }

    pub fn simulated(cfg: &Config) -> Self {
        let index = cfg.camera.candidates.first().copied().unwrap_or(0);
        info!(camera_index = index, "using simulated devices");
        Self {
            scale: Some(Box::new(SimulatedScale::new())),
            // Idle level of the metal sensor line is "absent".
            metal: Some(Box::new(SimulatedInput::new(cfg.metal.active_low))),
            servos: Some(Box::new(SimulatedServos)),
            light: cfg
                .light
                .enabled
                .then(|| Box::new(SimulatedLight) as Box<dyn Illuminator + Send>),
            camera: Box::new(SimulatedCamera::new(index, SIM_FRAME_WIDTH, SIM_FRAME_HEIGHT)),
            faults: Vec::new(),
        }
    }

    #[cfg(feature = "hardware")]
    fn hardware(cfg: &Config) -> Self {
        use sorter_hardware::HardwareScale;
        use sorter_hardware::gpio::GpioInput;
        use sorter_hardware::pca9685::Pca9685Servos;
        use sorter_hardware::util::PulseRange;
        use sorter_hardware::ws2812::SpiPixelStrip;

        let mut faults = Vec::new();
        let scale = keep(
            "scale",
            HardwareScale::try_new(cfg.pins.hx711_dt, cfg.pins.hx711_sck),
            &mut faults,
        )
        .map(|s| Box::new(s) as Box<dyn Scale + Send>);
        let metal = keep(
            "metal",
            GpioInput::open(cfg.pins.metal_in, cfg.metal.pull_up),
            &mut faults,
        )
        .map(|m| Box::new(m) as Box<dyn DigitalInput + Send>);
        let range = PulseRange {
            min_pulse_us: cfg.servo.min_pulse_us,
            max_pulse_us: cfg.servo.max_pulse_us,
            range_deg: cfg.servo.actuation_range_deg,
        };
        let servos = keep(
            "servos",
            Pca9685Servos::open(cfg.servo.i2c_bus, cfg.servo.i2c_address, cfg.servo.pwm_hz, range),
            &mut faults,
        )
        .map(|s| Box::new(s) as Box<dyn ServoDriver + Send>);
        let light = if cfg.light.enabled {
            keep(
                "light",
                SpiPixelStrip::open(
                    cfg.light.spi_bus,
                    cfg.light.pixels,
                    cfg.light.brightness,
                    pixel_order(cfg.light.order),
                ),
                &mut faults,
            )
            .map(|l| Box::new(l) as Box<dyn Illuminator + Send>)
        } else {
            None
        };

        Self {
            scale,
            metal,
            servos,
            light,
            camera: camera_device(),
            faults,
        }
    }

    #[cfg(not(feature = "hardware"))]
    fn hardware(cfg: &Config) -> Self {
        warn!("built without the `hardware` feature; falling back to simulated devices");
        Self::simulated(cfg)
    }
}

#[cfg(feature = "hardware")]
fn keep<T>(
    device: &'static str,
    opened: sorter_hardware::error::Result<T>,
    faults: &mut Vec<DeviceFault>,
) -> Option<T> {
    match opened {
        Ok(dev) => Some(dev),
        Err(e) => {
            warn!(device, error = %e, "device unavailable; continuing without it");
            faults.push(DeviceFault {
                device,
                error: e.to_string(),
            });
            None
        }
    }
}

#[cfg(feature = "hardware")]
pub fn pixel_order(order: sorter_config::LightOrder) -> sorter_hardware::util::PixelOrder {
    use sorter_config::LightOrder;
    use sorter_hardware::util::PixelOrder;
    match order {
        LightOrder::Rgb => PixelOrder::Rgb,
        LightOrder::Grb => PixelOrder::Grb,
    }
}

#[cfg(all(feature = "hardware", feature = "camera"))]
fn camera_device() -> Box<dyn VideoDevice + Send> {
    Box::new(sorter_hardware::capture::OpenCvCamera::new())
}

#[cfg(all(feature = "hardware", not(feature = "camera")))]
fn camera_device() -> Box<dyn VideoDevice + Send> {
    warn!("built without the `camera` feature; no capture device available");
    Box::new(NoCamera)
}

/// Capture device for builds without a camera backend: nothing ever opens.
#[derive(Debug, Default)]
pub struct NoCamera;

impl VideoDevice for NoCamera {
    fn open(&mut self, index: i32) -> Result<Box<dyn VideoStream + Send>, BoxError> {
        Err(format!("no capture backend compiled in (index {index})").into())
    }
}

/// Stand-in classifier for simulation: ranks the mean red, green and blue of
/// the input as can, other and plastic respectively.
pub struct ColourBackend {
    input: ModelInput,
}

impl ColourBackend {
    pub fn new(input: ModelInput) -> Self {
        Self { input }
    }
}

impl InferenceBackend for ColourBackend {
    fn infer(&mut self, input: &[f32], _w: u32, _h: u32) -> Result<Vec<f32>, ClassifierError> {
        if input.is_empty() || input.len() % 3 != 0 {
            return Err(ClassifierError::Inference(format!(
                "expected RGB triples, got {} values",
                input.len()
            )));
        }
        let scale = if self.input.scale == 0.0 {
            1.0
        } else {
            self.input.scale
        };
        let mut sums = [0.0f64; 3];
        for px in input.chunks_exact(3) {
            for (sum, v) in sums.iter_mut().zip(px) {
                *sum += f64::from((v - self.input.offset) / scale);
            }
        }
        let n = (input.len() / 3) as f64;
        let [r, g, b] = sums.map(|s| (s / n) as f32);
        // Class order: 0 can, 1 other, 2 plastic.
        Ok(vec![r, g, b])
    }
}

/// Inference backend for the configured model.
pub fn load_backend(
    cfg: &Config,
    sim: bool,
) -> Result<Box<dyn InferenceBackend + Send>, ClassifierError> {
    if sim {
        return Ok(Box::new(ColourBackend::new((&cfg.model).into())));
    }
    model_backend(cfg)
}

#[cfg(feature = "onnx")]
fn model_backend(cfg: &Config) -> Result<Box<dyn InferenceBackend + Send>, ClassifierError> {
    let backend = sorter_core::classifier::OnnxBackend::load(std::path::Path::new(&cfg.model.path))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "onnx"))]
fn model_backend(cfg: &Config) -> Result<Box<dyn InferenceBackend + Send>, ClassifierError> {
    Err(ClassifierError::Model(format!(
        "{}: built without the `onnx` feature",
        cfg.model.path
    )))
}

/// Assemble the station from opened devices.
pub fn build_station(
    cfg: &Config,
    devices: Devices,
    backend: Box<dyn InferenceBackend + Send>,
    api: impl KioskApi + Send + Sync + 'static,
) -> eyre::Result<Station> {
    let Devices {
        scale,
        metal,
        servos,
        light,
        camera,
        faults,
    } = devices;
    if !faults.is_empty() {
        warn!(count = faults.len(), "station starting with missing devices");
    }

    let mut builder = Station::builder()
        .with_config(cfg)
        .with_camera(camera)
        .with_backend(backend)
        .with_kiosk_api(api);
    if let Some(s) = scale {
        builder = builder.with_scale(s);
    }
    if let Some(m) = metal {
        builder = builder.with_metal_input(m);
    }
    if let Some(s) = servos {
        builder = builder.with_servos(s);
    }
    if let Some(l) = light {
        builder = builder.with_light(l);
    }
    Ok(builder.build()?)
}
