//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use sorter_core::Label;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sorter", version, about = "Recycling sorter kiosk")]
pub struct Cli {
    /// Path to config TOML (typed); a missing file means all defaults
    #[arg(long, value_name = "FILE", default_value = "etc/sorter.toml")]
    pub config: PathBuf,

    /// Optional scale calibration CSV (strict `raw,grams` header)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log and report errors as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Use simulated devices instead of the Raspberry Pi peripherals
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub sim: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

impl Cli {
    /// Builds without the `hardware` feature always run simulated.
    pub fn simulated(&self) -> bool {
        self.sim || !cfg!(feature = "hardware")
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LabelArg {
    Plastic,
    Can,
    Other,
}

impl From<LabelArg> for Label {
    fn from(l: LabelArg) -> Self {
        match l {
            LabelArg::Plastic => Self::Plastic,
            LabelArg::Can => Self::Can,
            LabelArg::Other => Self::Other,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP kiosk
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Construct every device once and report what works
    SelfCheck,
    /// Derive scale.reference_unit from a known mass
    Calibrate {
        /// Mass placed on the platform, in grams
        #[arg(long, value_name = "GRAMS")]
        known_grams: f32,
        /// Raw readings to collect with the mass in place
        #[arg(long, value_name = "N", default_value_t = 20)]
        samples: usize,
    },
    /// Classify an image file and print label and raw scores
    Classify {
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
    },
    /// Run one actuator sequence for a label
    Sort {
        #[arg(long, value_enum)]
        label: LabelArg,
    },
}
