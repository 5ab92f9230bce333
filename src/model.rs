use std::path::Path;

use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, RgbImage, RgbaImage};
use log::{debug, info};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;

use crate::config::EngineSpec;
use crate::errors::{BoxError, Result, SegBatchError};
use crate::imageops::apply_alpha_mask;
use crate::traits::{EngineOutput, SegmentationEngine};

/// Input side used when the model does not declare a fixed one.
pub const DEFAULT_INPUT_SIZE: u32 = 1024;
const NORMALIZE_MEAN: f32 = 0.5;
const NORMALIZE_STD: f32 = 1.0;

/// ISNet / U2-Net style background remover backed by ONNX Runtime.
///
/// `Session::run` needs exclusive access, so inference itself is serialized by the
/// session lock; resizing and mask application run outside it.
pub struct OnnxEngine {
    model_name: String,
    image_size: u32,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl OnnxEngine {
    pub fn new(spec: &EngineSpec) -> Result<Self> {
        let init_error = |source: BoxError| SegBatchError::EngineInitialization {
            model: spec.model_name.clone(),
            source,
        };

        let model_path = spec.model_file().map_err(|e| init_error(Box::new(e)))?;
        if !model_path.is_file() {
            return Err(init_error(
                format!(
                    "model file {} not found; place `{}.onnx` there or pass --model-path",
                    model_path.display(),
                    spec.model_name
                )
                .into(),
            ));
        }

        let session = build_session(&model_path, spec.device_id).map_err(init_error)?;
        let engine = Self::from_session(&spec.model_name, session).map_err(init_error)?;

        info!(
            "Model {} ready (input {}x{})",
            model_path.display(),
            engine.image_size(),
            engine.image_size()
        );
        Ok(engine)
    }

    fn from_session(model_name: &str, mut session: Session) -> std::result::Result<Self, BoxError> {
        let input = session.inputs.first().ok_or("model declares no inputs")?;
        let output = session.outputs.first().ok_or("model declares no outputs")?;
        let input_name = input.name.clone();
        let output_name = output.name.clone();

        let image_size = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.get(2).copied())
            .filter(|&side| side > 0)
            .map_or(DEFAULT_INPUT_SIZE, |side| side as u32);

        // warm-up run so the first job does not pay for provider setup
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        session.run(ort::inputs![
            input_name.as_str() => TensorRef::from_array_view(&data.as_standard_layout())?
        ])?;
        debug!("Warm-up inference finished for `{model_name}`");

        Ok(Self {
            model_name: model_name.to_string(),
            image_size,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub const fn image_size(&self) -> u32 {
        self.image_size
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<(u32, u32, Vec<f32>)> {
        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        let prediction = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;

        let shape = prediction.shape();
        if shape.len() < 2 {
            return Err(SegBatchError::engine(
                "mask extraction",
                format!("unexpected output shape {shape:?}"),
            ));
        }
        let (height, width) = (shape[shape.len() - 2], shape[shape.len() - 1]);
        let values = prediction.iter().take(width * height).copied().collect();
        Ok((width as u32, height as u32, values))
    }
}

fn build_session(model_path: &Path, device_id: i32) -> std::result::Result<Session, BoxError> {
    let session = SessionBuilder::new()
        .map_err(|e| format!("session builder: {e}"))?
        .with_execution_providers([
            TensorRTExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
            CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
        ])
        .map_err(|e| format!("execution providers: {e}"))?
        .with_memory_pattern(true)
        .map_err(|e| format!("memory pattern: {e}"))?
        .commit_from_file(model_path)
        .map_err(|e| format!("loading {}: {e}", model_path.display()))?;
    Ok(session)
}

impl SegmentationEngine for OnnxEngine {
    fn segment(&self, image: &RgbaImage) -> Result<EngineOutput> {
        let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
        let tensor = preprocess(&rgb, self.image_size);
        let (mask_width, mask_height, prediction) = self.predict(tensor.view())?;

        let mask = mask_from_prediction(&prediction, mask_width, mask_height)?;
        let (width, height) = image.dimensions();
        let mask = imageops::resize(&mask, width, height, FilterType::Lanczos3);

        let mut cutout = image.clone();
        apply_alpha_mask(&mut cutout, &mask)?;
        Ok(EngineOutput::from(cutout))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Resize to the square model input and build a normalized NCHW tensor.
pub fn preprocess(image: &RgbImage, image_size: u32) -> Array4<f32> {
    let resized = imageops::resize(image, image_size, image_size, FilterType::Lanczos3);
    let tensor = resized
        .as_ndarray3()
        .mapv(|v| (f32::from(v) / 255.0 - NORMALIZE_MEAN) / NORMALIZE_STD)
        .insert_axis(Axis(0));
    tensor.as_standard_layout().into_owned()
}

/// Min-max normalize a raw prediction into an 8-bit mask.
pub fn mask_from_prediction(prediction: &[f32], width: u32, height: u32) -> Result<GrayImage> {
    let (min, max) = prediction
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let pixels = prediction
        .iter()
        .map(|&v| {
            let normalized = if range > f32::EPSILON {
                (v - min) / range
            } else {
                0.0
            };
            (normalized * 255.0).round().clamp(0.0, 255.0) as u8
        })
        .collect();

    GrayImage::from_raw(width, height, pixels).ok_or_else(|| {
        SegBatchError::engine(
            "mask extraction",
            format!(
                "prediction has {} values, expected {}x{}",
                prediction.len(),
                width,
                height
            ),
        )
    })
}
