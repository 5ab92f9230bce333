use clap::Parser;
use std::path::{Path, PathBuf};
use std::thread;

use crate::errors::{Result, SegBatchError};

pub const DEFAULT_MODEL: &str = "isnet-general-use";
const MAX_DEFAULT_JOBS: usize = 8;

/// Remove the background of every image in a directory and write transparent PNGs.
#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Directory containing the source images
    pub input_dir: PathBuf,

    /// Directory receiving the PNG results
    pub output_dir: PathBuf,

    /// Include subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Mirror the input directory layout under the output directory
    #[arg(short, long)]
    pub keep_structure: bool,

    /// Overwrite outputs that already exist
    #[arg(short, long)]
    pub force: bool,

    /// Number of worker threads
    #[arg(short, long, default_value_t = default_jobs(), value_parser = parse_positive::<usize>)]
    pub jobs: usize,

    /// Downscale images so neither side exceeds this many pixels before segmentation
    #[arg(long, value_parser = parse_positive::<u32>)]
    pub max_size: Option<u32>,

    /// Model name, looked up as `<model-dir>/<name>.onnx`
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Explicit ONNX model file (overrides the name lookup)
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Model cache directory (defaults to ~/.u2net)
    #[arg(long, env = "U2NET_HOME")]
    pub model_dir: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Run engine calls one at a time instead of concurrently
    #[arg(long)]
    pub serialize_engine: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            recursive: self.recursive,
            keep_structure: self.keep_structure,
            force: self.force,
            workers: self.jobs,
            max_dimension: self.max_size,
            engine_access: if self.serialize_engine {
                EngineAccess::Serialized
            } else {
                EngineAccess::Shared
            },
        }
    }

    pub fn engine_spec(&self) -> EngineSpec {
        EngineSpec {
            model_name: self.model.clone(),
            model_path: self.model_path.clone(),
            model_dir: self.model_dir.clone(),
            device_id: self.device_id,
        }
    }
}

/// How worker threads may use the shared engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineAccess {
    /// Calls run concurrently; the engine must be safe for that.
    #[default]
    Shared,
    /// Every call runs inside one critical section.
    Serialized,
}

/// Options fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub recursive: bool,
    pub keep_structure: bool,
    pub force: bool,
    pub workers: usize,
    pub max_dimension: Option<u32>,
    pub engine_access: EngineAccess,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            keep_structure: false,
            force: false,
            workers: default_jobs(),
            max_dimension: None,
            engine_access: EngineAccess::default(),
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SegBatchError::Configuration {
                message: "worker count must be at least 1".to_string(),
            });
        }
        if self.max_dimension == Some(0) {
            return Err(SegBatchError::Configuration {
                message: "max dimension must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Where to find the segmentation model and which device to run it on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSpec {
    pub model_name: String,
    pub model_path: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub device_id: i32,
}

impl EngineSpec {
    pub fn named(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model_path: None,
            model_dir: None,
            device_id: 0,
        }
    }

    /// Resolve the model file without checking that it exists.
    pub fn model_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.model_path {
            return Ok(path.clone());
        }
        let dir = match &self.model_dir {
            Some(dir) => dir.clone(),
            None => default_model_dir().ok_or_else(|| SegBatchError::Configuration {
                message: "cannot locate a home directory for the model cache; pass --model-dir"
                    .to_string(),
            })?,
        };
        Ok(model_file_in(&dir, &self.model_name))
    }
}

fn default_model_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".u2net"))
}

fn model_file_in(dir: &Path, model_name: &str) -> PathBuf {
    dir.join(format!("{model_name}.onnx"))
}

pub fn default_jobs() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_DEFAULT_JOBS)
}

fn parse_positive<T>(s: &str) -> std::result::Result<T, String>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let value = s
        .parse::<T>()
        .map_err(|_| format!("`{s}` is not a valid number"))?;
    if value <= T::default() {
        return Err(format!("`{s}` must be at least 1"));
    }
    Ok(value)
}
