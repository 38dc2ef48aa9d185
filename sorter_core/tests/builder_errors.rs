use sorter_core::config::{ServoGeometry, WeightCfg};
use sorter_core::error::BuildError;
use sorter_core::mocks::{FixedScores, StillCamera, StubKioskApi};
use sorter_core::Station;

#[test]
fn try_build_reports_missing_camera() {
    let err = Station::builder()
        .with_backend(FixedScores::new(vec![1.0]))
        .with_kiosk_api(StubKioskApi::new("t", "s"))
        .try_build()
        .err()
        .unwrap();
    assert!(matches!(err, BuildError::MissingCamera));
}

#[test]
fn try_build_reports_missing_backend() {
    let err = Station::builder()
        .with_camera(StillCamera::new(vec![0]))
        .with_kiosk_api(StubKioskApi::new("t", "s"))
        .try_build()
        .err()
        .unwrap();
    assert!(matches!(err, BuildError::MissingBackend));
}

#[test]
fn zero_sample_count_is_invalid() {
    let err = Station::builder()
        .with_camera(StillCamera::new(vec![0]))
        .with_backend(FixedScores::new(vec![1.0]))
        .with_kiosk_api(StubKioskApi::new("t", "s"))
        .with_weight_cfg(WeightCfg {
            samples: 0,
            ..WeightCfg::default()
        })
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[test]
fn shared_servo_channel_is_invalid() {
    let err = Station::builder()
        .with_camera(StillCamera::new(vec![0]))
        .with_backend(FixedScores::new(vec![1.0]))
        .with_kiosk_api(StubKioskApi::new("t", "s"))
        .with_servo_geometry(ServoGeometry {
            slapper_channel: 15,
            ..ServoGeometry::default()
        })
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[test]
fn builds_from_default_config_file() {
    let cfg = sorter_config::Config::default();
    let station = Station::builder()
        .with_config(&cfg)
        .with_camera(StillCamera::new(vec![0]))
        .with_backend(FixedScores::new(vec![1.0]))
        .with_kiosk_api(StubKioskApi::new("t", "s"))
        .build();
    assert!(station.is_ok());
}
