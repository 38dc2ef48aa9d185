//! Test and helper mocks for sorter_core.
//!
//! Every hardware seam has a scripted or spying stand-in. Spies share their
//! records through cloneable handles so a test can keep one after moving the
//! device into a `Station`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sorter_traits::{DigitalInput, Frame, Illuminator, Scale, ServoDriver, VideoDevice, VideoStream};

use crate::classifier::InferenceBackend;
use crate::error::{ClassifierError, ReportError};
use crate::report::{KioskApi, StartReply, StopReport};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared, ordered record of device activity across several mocks.
pub type EventLog = Arc<Mutex<Vec<&'static str>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Scale returning scripted raw values in order, repeating the last one.
pub struct ScriptedScale {
    values: Vec<i32>,
    idx: usize,
    log: Option<EventLog>,
    delay: Duration,
}

impl ScriptedScale {
    pub fn new(values: Vec<i32>) -> Self {
        Self {
            values,
            idx: 0,
            log: None,
            delay: Duration::ZERO,
        }
    }

    /// Record a `"scale"` event per read.
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Real-time delay per read, to widen race windows in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Scale for ScriptedScale {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(log) = &self.log {
            log.lock().push("scale");
        }
        let v = self
            .values
            .get(self.idx)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0);
        self.idx += 1;
        Ok(v)
    }
}

/// Scale whose every read fails.
pub struct FailingScale {
    timeout: bool,
}

impl FailingScale {
    pub fn timeout() -> Self {
        Self { timeout: true }
    }

    pub fn broken() -> Self {
        Self { timeout: false }
    }
}

impl Scale for FailingScale {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        if self.timeout {
            Err(Box::new(std::io::Error::other("timeout")))
        } else {
            Err(Box::new(std::io::Error::other("adc disconnected")))
        }
    }
}

/// Digital line fixed at one level.
pub struct StaticInput {
    high: bool,
}

impl StaticInput {
    pub fn new(high: bool) -> Self {
        Self { high }
    }
}

impl DigitalInput for StaticInput {
    fn is_high(&mut self) -> Result<bool, BoxError> {
        Ok(self.high)
    }
}

/// Digital line whose every read fails.
pub struct FailingInput;

impl DigitalInput for FailingInput {
    fn is_high(&mut self) -> Result<bool, BoxError> {
        Err(Box::new(std::io::Error::other("gpio line unreadable")))
    }
}

/// Digital line stepping through scripted levels, repeating the last one.
pub struct ScriptedInput {
    levels: Vec<bool>,
    idx: usize,
}

impl ScriptedInput {
    pub fn new(levels: Vec<bool>) -> Self {
        Self { levels, idx: 0 }
    }
}

impl DigitalInput for ScriptedInput {
    fn is_high(&mut self) -> Result<bool, BoxError> {
        let v = self
            .levels
            .get(self.idx)
            .or_else(|| self.levels.last())
            .copied()
            .unwrap_or(false);
        self.idx += 1;
        Ok(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoCall {
    Angle { channel: u8, degrees: f32 },
    Release { channel: u8 },
}

/// Servo driver recording every call. Optionally fails the Nth angle command.
pub struct SpyServo {
    calls: Arc<Mutex<Vec<ServoCall>>>,
    fail_on_angle: Option<usize>,
    angles: usize,
    log: Option<EventLog>,
}

impl Default for SpyServo {
    fn default() -> Self {
        Self::new()
    }
}

impl SpyServo {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on_angle: None,
            angles: 0,
            log: None,
        }
    }

    /// Make the `n`th (0-based) `set_angle` call fail.
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on_angle = Some(n);
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<ServoCall>>> {
        self.calls.clone()
    }
}

impl ServoDriver for SpyServo {
    fn set_angle(&mut self, channel: u8, degrees: f32) -> Result<(), BoxError> {
        let n = self.angles;
        self.angles += 1;
        if self.fail_on_angle == Some(n) {
            return Err(Box::new(std::io::Error::other("i2c nack")));
        }
        if let Some(log) = &self.log {
            log.lock().push("servo");
        }
        self.calls.lock().push(ServoCall::Angle { channel, degrees });
        Ok(())
    }

    fn release(&mut self, channel: u8) -> Result<(), BoxError> {
        if let Some(log) = &self.log {
            log.lock().push("release");
        }
        self.calls.lock().push(ServoCall::Release { channel });
        Ok(())
    }
}

/// Light strip recording every fill.
#[derive(Default)]
pub struct SpyLight {
    fills: Arc<Mutex<Vec<[u8; 3]>>>,
}

impl SpyLight {
    pub fn fills(&self) -> Arc<Mutex<Vec<[u8; 3]>>> {
        self.fills.clone()
    }
}

impl Illuminator for SpyLight {
    fn fill(&mut self, rgb: [u8; 3]) -> Result<(), BoxError> {
        self.fills.lock().push(rgb);
        Ok(())
    }
}

/// Backend returning the same scores for every input.
pub struct FixedScores {
    scores: Vec<f32>,
}

impl FixedScores {
    pub fn new(scores: Vec<f32>) -> Self {
        Self { scores }
    }
}

impl InferenceBackend for FixedScores {
    fn infer(&mut self, _input: &[f32], _w: u32, _h: u32) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.scores.clone())
    }
}

/// Backend returning queued score vectors in order; errors once exhausted.
pub struct ScriptedScores {
    queue: VecDeque<Vec<f32>>,
}

impl ScriptedScores {
    pub fn new(queue: impl IntoIterator<Item = Vec<f32>>) -> Self {
        Self {
            queue: queue.into_iter().collect(),
        }
    }
}

impl InferenceBackend for ScriptedScores {
    fn infer(&mut self, _input: &[f32], _w: u32, _h: u32) -> Result<Vec<f32>, ClassifierError> {
        self.queue
            .pop_front()
            .ok_or_else(|| ClassifierError::Inference("script exhausted".into()))
    }
}

/// Camera answering on a set of indices with a solid grey frame.
pub struct StillCamera {
    responsive: Vec<i32>,
    opened: Arc<Mutex<Vec<i32>>>,
}

impl StillCamera {
    pub fn new(responsive: Vec<i32>) -> Self {
        Self {
            responsive,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Indices `open` was called with, in order.
    pub fn opened(&self) -> Arc<Mutex<Vec<i32>>> {
        self.opened.clone()
    }
}

struct StillStream;

impl VideoStream for StillStream {
    fn read_frame(&mut self) -> Result<Option<Frame>, BoxError> {
        std::thread::sleep(Duration::from_millis(1));
        Ok(Frame::solid(32, 24, [90, 90, 90]))
    }
}

impl VideoDevice for StillCamera {
    fn open(&mut self, index: i32) -> Result<Box<dyn VideoStream + Send>, BoxError> {
        self.opened.lock().push(index);
        if self.responsive.contains(&index) {
            Ok(Box::new(StillStream))
        } else {
            Err(Box::new(std::io::Error::other(format!(
                "no device at index {index}"
            ))))
        }
    }
}

/// Kiosk API answering START with a fixed reply and recording STOP reports.
pub struct StubKioskApi {
    reply: StartReply,
    stops: Arc<Mutex<Vec<StopReport>>>,
}

impl StubKioskApi {
    pub fn new(transaction_id: &str, claim_secret: &str) -> Self {
        Self {
            reply: StartReply {
                transaction_id: Some(transaction_id.to_string()),
                claim_secret: Some(claim_secret.to_string()),
            },
            stops: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn stops(&self) -> Arc<Mutex<Vec<StopReport>>> {
        self.stops.clone()
    }
}

impl KioskApi for StubKioskApi {
    fn start_session(&self) -> Result<StartReply, ReportError> {
        Ok(self.reply.clone())
    }

    fn report_stop(&self, report: &StopReport) -> Result<(), ReportError> {
        self.stops.lock().push(report.clone());
        Ok(())
    }
}

/// Kiosk API that is never reachable.
pub struct UnreachableKioskApi;

impl KioskApi for UnreachableKioskApi {
    fn start_session(&self) -> Result<StartReply, ReportError> {
        Err(ReportError::Network("connection refused".into()))
    }

    fn report_stop(&self, _report: &StopReport) -> Result<(), ReportError> {
        Err(ReportError::Network("connection refused".into()))
    }
}
