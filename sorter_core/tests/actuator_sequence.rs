use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use sorter_core::actuator::{ActuatorSequencer, ActuatorState};
use sorter_core::config::{SequenceTiming, ServoGeometry};
use sorter_core::error::ActuatorError;
use sorter_core::mocks::{ServoCall, SpyServo};
use sorter_core::types::Label;
use sorter_traits::ManualClock;

fn sequencer(spy: SpyServo, clock: &ManualClock) -> ActuatorSequencer {
    ActuatorSequencer::new(
        Some(Box::new(spy)),
        ServoGeometry::default(),
        SequenceTiming::default(),
        Arc::new(clock.clone()),
    )
}

#[rstest]
#[case(Label::Plastic, 95.0)]
#[case(Label::Can, 25.0)]
fn accepted_label_runs_full_sequence(#[case] label: Label, #[case] gate_deg: f32) {
    let spy = SpyServo::new();
    let calls = spy.calls();
    let clock = ManualClock::new();
    let mut seq = sequencer(spy, &clock);

    seq.sort(label).unwrap();

    assert_eq!(
        *calls.lock(),
        vec![
            ServoCall::Angle {
                channel: 15,
                degrees: gate_deg
            },
            ServoCall::Angle {
                channel: 0,
                degrees: 160.0
            },
            ServoCall::Angle {
                channel: 0,
                degrees: 65.0
            },
            ServoCall::Angle {
                channel: 15,
                degrees: 60.0
            },
            ServoCall::Release { channel: 15 },
            ServoCall::Release { channel: 0 },
        ]
    );
    // settle + travel + return + gate return
    assert_eq!(clock.elapsed(), Duration::from_millis(2000));
    assert_eq!(seq.state(), ActuatorState::Idle);
}

#[test]
fn other_label_never_moves() {
    let spy = SpyServo::new();
    let calls = spy.calls();
    let clock = ManualClock::new();
    let mut seq = sequencer(spy, &clock);

    seq.sort(Label::Other).unwrap();

    assert!(calls.lock().is_empty());
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[test]
fn missing_driver_is_a_silent_no_op() {
    let clock = ManualClock::new();
    let mut seq = ActuatorSequencer::new(
        None,
        ServoGeometry::default(),
        SequenceTiming::default(),
        Arc::new(clock.clone()),
    );
    assert!(!seq.has_driver());
    seq.sort(Label::Plastic).unwrap();
    seq.park().unwrap();
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[test]
fn servo_failure_parks_and_reports_channel() {
    // second angle command (slapper hit) fails
    let spy = SpyServo::new().failing_on(1);
    let calls = spy.calls();
    let clock = ManualClock::new();
    let mut seq = sequencer(spy, &clock);

    let err = seq.sort(Label::Can).unwrap_err();
    assert!(matches!(err, ActuatorError::Servo { channel: 0, .. }));
    assert_eq!(seq.state(), ActuatorState::Idle);

    let calls = calls.lock();
    assert_eq!(
        calls.last(),
        Some(&ServoCall::Release { channel: 0 }),
        "mechanism must be released after a failure: {calls:?}"
    );
    assert!(calls.contains(&ServoCall::Angle {
        channel: 15,
        degrees: 60.0
    }));
}

#[test]
fn park_moves_to_rest_then_releases() {
    let spy = SpyServo::new();
    let calls = spy.calls();
    let clock = ManualClock::new();
    let mut seq = sequencer(spy, &clock);

    seq.park().unwrap();

    assert_eq!(calls.lock().len(), 4);
    assert_eq!(clock.elapsed(), Duration::from_millis(500));
}
