//! Image classifier: BGR frame in, label plus raw scores out.
//!
//! Preprocessing converts to RGB, resizes (bilinear) to the model's fixed input
//! and maps each byte `v` to `v * scale + offset`, laid out NHWC. Inference
//! engines are not reentrant, so the backend sits behind a mutex held for the
//! whole forward pass.

use image::RgbImage;
use image::imageops::{self, FilterType};
use parking_lot::Mutex;
use sorter_traits::Frame;
use tracing::debug;

use crate::config::ModelInput;
use crate::error::ClassifierError;
use crate::types::{ClassificationResult, Label};

/// One forward pass over a `[1, height, width, 3]` float tensor.
pub trait InferenceBackend {
    fn infer(&mut self, input: &[f32], width: u32, height: u32)
    -> Result<Vec<f32>, ClassifierError>;
}

impl<T: InferenceBackend + ?Sized> InferenceBackend for Box<T> {
    fn infer(
        &mut self,
        input: &[f32],
        width: u32,
        height: u32,
    ) -> Result<Vec<f32>, ClassifierError> {
        (**self).infer(input, width, height)
    }
}

pub struct Classifier {
    backend: Mutex<Box<dyn InferenceBackend + Send>>,
    input: ModelInput,
}

impl Classifier {
    pub fn new(backend: Box<dyn InferenceBackend + Send>, input: ModelInput) -> Self {
        Self {
            backend: Mutex::new(backend),
            input,
        }
    }

    pub fn classify(&self, frame: &Frame) -> Result<ClassificationResult, ClassifierError> {
        let tensor = preprocess(frame, &self.input)?;
        let scores = {
            let mut backend = self.backend.lock();
            backend.infer(&tensor, self.input.width, self.input.height)?
        };
        let idx = argmax(&scores).ok_or(ClassifierError::EmptyOutput)?;
        let label = Label::from_class_index(idx);
        debug!(%label, idx, ?scores, "classified frame");
        Ok(ClassificationResult {
            label,
            raw_scores: scores,
        })
    }
}

/// Frame to model input tensor (NHWC, RGB, scaled).
pub fn preprocess(frame: &Frame, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
    if input.width == 0 || input.height == 0 {
        return Err(ClassifierError::Preprocess("model input has zero size".into()));
    }
    let rgb: Vec<u8> = frame
        .bgr()
        .chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect();
    let img = RgbImage::from_raw(frame.width(), frame.height(), rgb).ok_or_else(|| {
        ClassifierError::Preprocess("frame buffer does not match its dimensions".into())
    })?;
    let img = if img.dimensions() == (input.width, input.height) {
        img
    } else {
        imageops::resize(&img, input.width, input.height, FilterType::Triangle)
    };
    Ok(img
        .into_raw()
        .into_iter()
        .map(|v| f32::from(v) * input.scale + input.offset)
        .collect())
}

/// Index of the first maximum; NaN scores are ignored.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;

    use ort::session::Session;
    use ort::value::Tensor;
    use tracing::info;

    use super::InferenceBackend;
    use crate::error::ClassifierError;

    /// ONNX Runtime session for an NHWC float32 image classifier.
    pub struct OnnxBackend {
        session: Session,
    }

    impl OnnxBackend {
        pub fn load(path: &Path) -> Result<Self, ClassifierError> {
            let session = Session::builder()
                .and_then(|b| b.commit_from_file(path))
                .map_err(|e| ClassifierError::Model(format!("{}: {e}", path.display())))?;
            info!(model = %path.display(), "classifier model loaded");
            Ok(Self { session })
        }
    }

    impl InferenceBackend for OnnxBackend {
        fn infer(
            &mut self,
            input: &[f32],
            width: u32,
            height: u32,
        ) -> Result<Vec<f32>, ClassifierError> {
            let shape = [1usize, height as usize, width as usize, 3];
            let tensor = Tensor::from_array((shape, input.to_vec()))
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;
            let outputs = self
                .session
                .run(ort::inputs![tensor])
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;
            let (_, scores) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;
            Ok(scores.to_vec())
        }
    }
}
