//! Process-wide `tracing` subscriber.
//!
//! Precedence for the filter: `RUST_LOG`, then `--log-level`, then
//! `[logging].level`, then `info`. The optional file sink always writes JSON
//! lines; its worker guard lives in `cli::FILE_GUARD` until exit.

use std::path::Path;

use eyre::WrapErr;
use sorter_config::Logging;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub fn init(json: bool, level: Option<&str>, cfg: &Logging) -> eyre::Result<()> {
    let level = level.or(cfg.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    layers.push(if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    });

    if let Some(path) = cfg.file.as_deref() {
        let appender = file_appender(Path::new(path), cfg.rotation.as_deref())?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn file_appender(path: &Path, rotation: Option<&str>) -> eyre::Result<RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("create log directory {}", dir.display()))?;

    Ok(match rotation.unwrap_or("never") {
        "daily" => rolling::daily(dir, name),
        "hourly" => rolling::hourly(dir, name),
        _ => rolling::never(dir, name),
    })
}
