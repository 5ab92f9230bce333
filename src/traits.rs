use crate::errors::{Result, SegBatchError};
use image::{DynamicImage, RgbaImage};

/// Background segmentation engine shared by all workers.
///
/// Implementations are loaded once and then only read. `Sync` is required because
/// workers call `segment` through a shared reference; an engine that cannot answer
/// concurrent calls should be wrapped with `EngineAccess::Serialized`.
pub trait SegmentationEngine: Send + Sync {
    /// Remove the background of an RGBA image.
    fn segment(&self, image: &RgbaImage) -> Result<EngineOutput>;

    fn model_name(&self) -> &str;
}

/// The two shapes an engine may return.
#[derive(Debug, Clone)]
pub enum EngineOutput {
    /// An encoded image (PNG or any other format the codec understands).
    Encoded(Vec<u8>),
    /// An already decoded image.
    Image(DynamicImage),
}

impl EngineOutput {
    /// Normalize either shape to an 8-bit RGBA buffer.
    pub fn into_rgba8(self) -> Result<RgbaImage> {
        match self {
            Self::Image(image) => Ok(image.into_rgba8()),
            Self::Encoded(bytes) => image::load_from_memory(&bytes)
                .map(DynamicImage::into_rgba8)
                .map_err(|e| SegBatchError::engine("engine output decoding", e)),
        }
    }
}

impl From<DynamicImage> for EngineOutput {
    fn from(image: DynamicImage) -> Self {
        Self::Image(image)
    }
}

impl From<RgbaImage> for EngineOutput {
    fn from(image: RgbaImage) -> Self {
        Self::Image(DynamicImage::ImageRgba8(image))
    }
}
