use std::cell::Cell;
use std::time::{Duration, Instant};

use sorter_hardware::error::HwError;
use sorter_hardware::util::wait_until_low_with_timeout;

#[test]
fn returns_once_the_line_drops() {
    let polls = Cell::new(0u32);
    let res = wait_until_low_with_timeout(
        || {
            polls.set(polls.get() + 1);
            polls.get() < 4
        },
        Duration::from_millis(200),
        Duration::from_micros(50),
    );
    assert!(res.is_ok(), "{res:?}");
    assert_eq!(polls.get(), 4);
}

#[test]
fn already_low_line_returns_without_sleeping() {
    let started = Instant::now();
    wait_until_low_with_timeout(|| false, Duration::ZERO, Duration::from_secs(1)).unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn stuck_high_line_reports_data_ready_timeout() {
    let started = Instant::now();
    let err = wait_until_low_with_timeout(|| true, Duration::from_millis(5), Duration::from_micros(100))
        .unwrap_err();
    assert!(matches!(err, HwError::DataReadyTimeout), "{err:?}");
    assert!(started.elapsed() >= Duration::from_millis(5));
}
