//! Engines for tests that do not need a real model.

use crate::errors::{Result, SegBatchError};
use crate::traits::{EngineOutput, SegmentationEngine};
use image::{DynamicImage, ImageFormat, RgbaImage};
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Returns the input unchanged as a decoded image.
#[derive(Debug, Clone, Default)]
pub struct PassthroughEngine;

impl SegmentationEngine for PassthroughEngine {
    fn segment(&self, image: &RgbaImage) -> Result<EngineOutput> {
        Ok(EngineOutput::from(image.clone()))
    }

    fn model_name(&self) -> &str {
        "passthrough"
    }
}

/// Returns the input re-encoded as PNG bytes.
#[derive(Debug, Clone, Default)]
pub struct EncodedEngine;

impl SegmentationEngine for EncodedEngine {
    fn segment(&self, image: &RgbaImage) -> Result<EngineOutput> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| SegBatchError::engine("mock encoding", e))?;
        Ok(EngineOutput::Encoded(bytes))
    }

    fn model_name(&self) -> &str {
        "encoded"
    }
}

/// Fails every call.
#[derive(Debug, Clone, Default)]
pub struct FailingEngine;

impl SegmentationEngine for FailingEngine {
    fn segment(&self, _image: &RgbaImage) -> Result<EngineOutput> {
        Err(SegBatchError::engine("inference", "mock inference failure"))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Panics on every call.
#[derive(Debug, Clone, Default)]
pub struct PanickingEngine;

impl SegmentationEngine for PanickingEngine {
    fn segment(&self, _image: &RgbaImage) -> Result<EngineOutput> {
        panic!("mock engine panic")
    }

    fn model_name(&self) -> &str {
        "panicking"
    }
}

/// Records the dimensions of every image it receives.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    seen: Mutex<Vec<(u32, u32)>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<(u32, u32)> {
        self.seen.lock().clone()
    }
}

impl SegmentationEngine for RecordingEngine {
    fn segment(&self, image: &RgbaImage) -> Result<EngineOutput> {
        self.seen.lock().push(image.dimensions());
        Ok(EngineOutput::from(image.clone()))
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

/// Sleeps inside every call and tracks how many calls overlapped.
#[derive(Debug)]
pub struct ConcurrencyTrackingEngine {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ConcurrencyTrackingEngine {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl SegmentationEngine for ConcurrencyTrackingEngine {
    fn segment(&self, image: &RgbaImage) -> Result<EngineOutput> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(EngineOutput::from(image.clone()))
    }

    fn model_name(&self) -> &str {
        "concurrency-tracking"
    }
}
