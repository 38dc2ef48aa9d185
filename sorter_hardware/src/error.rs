use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("scale timeout")]
    Timeout,
    #[error("hx711 data-ready timeout")]
    DataReadyTimeout,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
