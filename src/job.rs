use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader, RgbaImage};
use log::debug;

use crate::engine::EngineHandle;
use crate::errors::{error_chain, BoxError, Result, SegBatchError};
use crate::imageops::resize_to_fit;
use crate::traits::SegmentationEngine;

const PARTIAL_SUFFIX: &str = "part";

/// Per-job slice of the run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobOptions {
    pub force: bool,
    pub max_dimension: Option<u32>,
}

/// One input image and the output it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: JobOptions,
}

/// Result of one job. Every dispatched job produces exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The output already existed and `force` was off.
    Skipped,
    Succeeded,
    Failed(String),
}

impl JobOutcome {
    fn from_error(err: &SegBatchError) -> Self {
        Self::Failed(error_chain(err))
    }
}

impl Job {
    pub const fn new(input: PathBuf, output: PathBuf, options: JobOptions) -> Self {
        Self {
            input,
            output,
            options,
        }
    }

    /// Run the full transform. Errors and panics become `JobOutcome::Failed`.
    pub fn execute<E: SegmentationEngine>(&self, engine: &EngineHandle<E>) -> JobOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_execute(engine))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => JobOutcome::from_error(&err),
            Err(payload) => JobOutcome::Failed(panic_message(payload.as_ref())),
        }
    }

    fn try_execute<E: SegmentationEngine>(&self, engine: &EngineHandle<E>) -> Result<JobOutcome> {
        if !self.options.force && self.output.exists() {
            debug!("Skipping {}: output exists", self.input.display());
            return Ok(JobOutcome::Skipped);
        }

        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent).map_err(|e| SegBatchError::FileSystem {
                path: parent.to_path_buf(),
                operation: "output directory creation".to_string(),
                source: e,
            })?;
        }

        let mut image = self.decode_input()?;
        if let Some(max_dimension) = self.options.max_dimension {
            image = resize_to_fit(image, max_dimension);
        }
        let rgba = image.into_rgba8();

        let cutout = engine.segment(&rgba)?;
        write_png(&cutout, &self.output)?;

        debug!("{} -> {}", self.input.display(), self.output.display());
        Ok(JobOutcome::Succeeded)
    }

    fn decode_input(&self) -> Result<DynamicImage> {
        let image_error = |operation: &str, source: BoxError| {
            SegBatchError::ImageProcessing {
                path: self.input.clone(),
                operation: operation.to_string(),
                source,
            }
        };

        ImageReader::open(&self.input)
            .map_err(|e| SegBatchError::FileSystem {
                path: self.input.clone(),
                operation: "image open".to_string(),
                source: e,
            })?
            .with_guessed_format()
            .map_err(|e| image_error("format detection", Box::new(e)))?
            .decode()
            .map_err(|e| image_error("image decoding", Box::new(e)))
    }
}

/// Encode `image` as PNG next to `output` and rename it into place, so an
/// interrupted write never leaves a truncated file that a later run would skip.
pub fn write_png(image: &RgbaImage, output: &Path) -> Result<()> {
    let partial = partial_path(output);
    let result = encode_to(image, &partial).and_then(|()| {
        fs::rename(&partial, output).map_err(|e| SegBatchError::FileSystem {
            path: output.to_path_buf(),
            operation: "rename into place".to_string(),
            source: e,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn encode_to(image: &RgbaImage, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| SegBatchError::FileSystem {
        path: path.to_path_buf(),
        operation: "output file creation".to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    PngEncoder::new_with_quality(&mut writer, CompressionType::Best, PngFilter::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| SegBatchError::ImageProcessing {
            path: path.to_path_buf(),
            operation: "png encoding".to_string(),
            source: Box::new(e),
        })?;

    writer.flush().map_err(|e| SegBatchError::FileSystem {
        path: path.to_path_buf(),
        operation: "output flush".to_string(),
        source: e,
    })
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("panicked: {detail}")
}
