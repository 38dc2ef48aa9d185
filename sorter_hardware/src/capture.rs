//! V4L2 video capture through OpenCV.

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{CAP_V4L2, VideoCapture};
use sorter_traits::{Frame, VideoDevice, VideoStream};
use tracing::debug;

use crate::error::HwError;

#[derive(Debug, Default)]
pub struct OpenCvCamera;

impl OpenCvCamera {
    pub fn new() -> Self {
        Self
    }
}

impl VideoDevice for OpenCvCamera {
    fn open(
        &mut self,
        index: i32,
    ) -> Result<Box<dyn VideoStream + Send>, Box<dyn std::error::Error + Send + Sync>> {
        let cap = VideoCapture::new(index, CAP_V4L2)
            .map_err(|e| HwError::Camera(format!("open {index}: {}", e.message)))?;
        let opened = cap
            .is_opened()
            .map_err(|e| HwError::Camera(format!("probe {index}: {}", e.message)))?;
        if !opened {
            return Err(Box::new(HwError::Camera(format!("device {index} did not open"))));
        }
        debug!(index, "video device opened");
        Ok(Box::new(OpenCvStream { cap }))
    }
}

struct OpenCvStream {
    cap: VideoCapture,
}

impl VideoStream for OpenCvStream {
    fn read_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
        let mut mat = Mat::default();
        let got = self
            .cap
            .read(&mut mat)
            .map_err(|e| HwError::Camera(e.message))?;
        if !got || mat.empty() {
            return Ok(None);
        }
        let mat = if mat.is_continuous() {
            mat
        } else {
            mat.try_clone().map_err(|e| HwError::Camera(e.message))?
        };
        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let bytes = mat
            .data_bytes()
            .map_err(|e| HwError::Camera(e.message))?
            .to_vec();
        Ok(Frame::from_bgr(width, height, bytes))
    }
}
