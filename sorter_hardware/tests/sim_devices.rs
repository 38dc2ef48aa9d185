use std::time::Duration;

use rstest::rstest;
use sorter_hardware::{SimulatedCamera, SimulatedInput, SimulatedScale};
use sorter_traits::{DigitalInput, Scale, VideoDevice};

#[rstest]
#[case(0.0, 0)]
#[case(5.0, 5000)]
#[case(-2.0, -2000)]
fn scale_handle_drives_owned_device(#[case] grams: f32, #[case] raw: i32) {
    let handle = SimulatedScale::new();
    let mut device = handle.clone();
    handle.load_grams(grams, 1000.0);
    assert_eq!(device.read(Duration::from_millis(1)).unwrap(), raw);
}

#[test]
fn input_handle_toggles_level() {
    let handle = SimulatedInput::new(true);
    let mut line = handle.clone();
    assert!(line.is_high().unwrap());
    handle.set_high(false);
    assert!(!line.is_high().unwrap());
}

#[test]
fn camera_colour_change_reaches_stream() {
    let cam = SimulatedCamera::new(0, 2, 1).with_frame_interval(Duration::ZERO);
    let mut device = cam.clone();
    let mut stream = device.open(0).unwrap();
    cam.show([1, 2, 3]);
    let frame = stream.read_frame().unwrap().unwrap();
    assert_eq!(frame.bgr(), &[1, 2, 3, 1, 2, 3]);
}
