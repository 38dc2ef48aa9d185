//! Background frame capture.
//!
//! A `FrameSource` owns one opened video stream on its own thread and keeps
//! only the most recent frame in a mutex-guarded slot. The lock is held for the
//! swap in and the clone out, never across device I/O.
//!
//! Each `FrameSource` spawns exactly one thread, stopped and joined on drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use sorter_traits::{Frame, VideoDevice, VideoStream};
use tracing::{debug, info, warn};

use crate::config::CameraCfg;
use crate::error::CameraError;
use crate::hw_error::map_camera_error;

type Slot = Arc<Mutex<Option<Frame>>>;

pub struct FrameSource {
    slot: Slot,
    index: i32,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl FrameSource {
    /// Try `candidates` in order; the first device that opens and yields a
    /// frame is kept and streamed in the background.
    pub fn start(
        device: &mut dyn VideoDevice,
        candidates: &[i32],
        retry: Duration,
    ) -> Result<Self, CameraError> {
        for &index in candidates {
            let mut stream = match device.open(index) {
                Ok(s) => s,
                Err(e) => {
                    debug!(index, error = %e, "camera candidate did not open");
                    continue;
                }
            };
            match stream.read_frame() {
                Ok(Some(first)) => {
                    info!(
                        index,
                        width = first.width(),
                        height = first.height(),
                        "camera started"
                    );
                    return Ok(Self::spawn(stream, first, index, retry));
                }
                Ok(None) => debug!(index, "camera candidate opened but gave no frame"),
                Err(e) => debug!(index, error = %e, "camera candidate read failed"),
            }
        }
        Err(CameraError::NoDevice {
            tried: candidates.to_vec(),
        })
    }

    fn spawn(
        mut stream: Box<dyn VideoStream + Send>,
        first: Frame,
        index: i32,
        retry: Duration,
    ) -> Self {
        let slot: Slot = Arc::new(Mutex::new(Some(first)));
        let shutdown = Arc::new(AtomicBool::new(false));
        let slot_bg = slot.clone();
        let shutdown_bg = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_bg.load(Ordering::Relaxed) {
                    debug!("frame source received shutdown signal");
                    break;
                }
                match stream.read_frame() {
                    Ok(Some(frame)) => {
                        *slot_bg.lock() = Some(frame);
                    }
                    Ok(None) => std::thread::sleep(retry),
                    Err(e) => {
                        let err = map_camera_error(e.as_ref());
                        warn!(index, error = %err, "frame read failed");
                        std::thread::sleep(retry);
                    }
                }
            }
            tracing::trace!("frame source thread exiting cleanly");
        });

        Self {
            slot,
            index,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Copy of the freshest frame, if any has arrived.
    pub fn latest(&self) -> Option<Frame> {
        self.slot.lock().clone()
    }

    pub fn device_index(&self) -> i32 {
        self.index
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            warn!("frame source thread panicked");
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns the video device and starts a `FrameSource` on first use.
pub struct Camera {
    device: Box<dyn VideoDevice + Send>,
    cfg: CameraCfg,
    source: Option<FrameSource>,
}

impl Camera {
    pub fn new(device: Box<dyn VideoDevice + Send>, cfg: CameraCfg) -> Self {
        Self {
            device,
            cfg,
            source: None,
        }
    }

    /// Start capturing unless already running. Returns the device index in use.
    pub fn ensure_running(&mut self) -> Result<i32, CameraError> {
        if let Some(src) = &self.source {
            return Ok(src.device_index());
        }
        let src = FrameSource::start(self.device.as_mut(), &self.cfg.candidates, self.cfg.retry)?;
        let index = src.device_index();
        self.source = Some(src);
        Ok(index)
    }

    pub fn is_running(&self) -> bool {
        self.source.is_some()
    }

    pub fn latest(&self) -> Result<Option<Frame>, CameraError> {
        self.source
            .as_ref()
            .map(FrameSource::latest)
            .ok_or(CameraError::NotStarted)
    }

    pub fn stop(&mut self) {
        if let Some(mut src) = self.source.take() {
            src.stop();
            info!(index = src.device_index(), "camera stopped");
        }
    }
}
