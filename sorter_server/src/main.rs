use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use sorter_config::{Config, load_calibration_csv};
use sorter_server::cli::{Cli, Commands, JSON_MODE};
use sorter_server::devices::{Devices, build_station, load_backend};
use sorter_server::error_fmt::{ConfigError, exit_code_for_error, format_error_json, humanize};
use sorter_server::http::{self, AppState};
use sorter_server::remote::HttpKioskApi;
use sorter_server::{logging, tools};
use tracing::info;

fn main() -> ExitCode {
    // A missing .env is normal on a configured device.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: error reporter not installed: {e}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&err));
            } else {
                eprintln!("{}", humanize(&err));
            }
            ExitCode::from(exit_code_for_error(&err))
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let load = || -> eyre::Result<Config> {
        let mut cfg = Config::load(&cli.config)?;
        cfg.apply_env_overrides(|k| std::env::var(k).ok());
        if let Some(path) = &cli.calibration {
            let cal = load_calibration_csv(path)
                .wrap_err_with(|| format!("calibration {}", path.display()))?;
            cfg.apply_calibration(&cal);
        }
        cfg.validate()?;
        Ok(cfg)
    };
    load().map_err(|e| ConfigError::from_report(&e))
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli)?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    let sim = cli.simulated();
    info!(config = %cli.config.display(), sim, "configuration loaded");

    match cli.cmd {
        Commands::Serve { bind } => serve(&cfg, bind, sim),
        Commands::SelfCheck => tools::report_self_check(&tools::self_check(&cfg, sim), cli.json),
        Commands::Calibrate {
            known_grams,
            samples,
        } => {
            let stdin = std::io::stdin();
            tools::calibrate(&cfg, sim, known_grams, samples, &mut stdin.lock(), cli.json)
                .map(|_| ())
        }
        Commands::Classify { image } => tools::classify(&cfg, sim, &image, cli.json).map(|_| ()),
        Commands::Sort { label } => tools::sort(&cfg, sim, label.into()),
    }
}

/// The station and its blocking HTTP client are created and dropped outside
/// the async runtime.
fn serve(cfg: &Config, bind: Option<String>, sim: bool) -> eyre::Result<()> {
    let backend = load_backend(cfg, sim)?;
    let api = HttpKioskApi::new(&cfg.remote)?;
    info!(url = api.url(), bin_id = %cfg.remote.bin_id, "kiosk api configured");
    let station = Arc::new(build_station(cfg, Devices::open(cfg, sim), backend, api)?);

    let addr = bind.unwrap_or_else(|| cfg.server.bind.clone());
    let state = AppState::new(Arc::clone(&station), &cfg.remote.base_url);
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("start async runtime")?;
    let served = rt.block_on(http::serve(state, &addr));
    drop(rt);

    station.shutdown();
    served
}
