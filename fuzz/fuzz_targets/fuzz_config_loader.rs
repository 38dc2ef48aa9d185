#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse or produce a config whose
    // validation and env overlay never panic.
    if let Ok(mut cfg) = sorter_config::load_toml(data) {
        cfg.apply_env_overrides(|k| (k == "BIN_ID").then(|| data.chars().take(16).collect()));
        let _ = cfg.validate();
        let _ = cfg.remote.kiosk_url();
    }
});
