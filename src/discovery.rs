use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{Result, SegBatchError};

pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// A source image found under the input root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageFile {
    path: PathBuf,
    extension: String,
}

impl ImageFile {
    /// Returns `None` when the path has no extension from the allow-list.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let extension = supported_extension(&path)?;
        Some(Self { path, extension })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercased extension, always one of `SUPPORTED_EXTENSIONS`.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

fn supported_extension(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    SUPPORTED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Check that `root` is an existing directory.
pub fn validate_root(root: &Path) -> Result<()> {
    let reason = match root.metadata() {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => "not a directory".to_string(),
        Err(e) => e.to_string(),
    };
    Err(SegBatchError::InvalidInputDirectory {
        path: root.to_path_buf(),
        reason,
    })
}

/// Collect the supported images under `root`, sorted by path.
///
/// Without `recursive` only direct children are considered. Entries that cannot be
/// read during the walk are logged and skipped.
pub fn discover(root: &Path, recursive: bool) -> Result<Vec<ImageFile>> {
    validate_root(root)?;

    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files: Vec<ImageFile> = walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| ImageFile::from_path(entry.into_path()))
        .collect();

    files.sort();
    debug!("Discovered {} image(s) under {}", files.len(), root.display());
    Ok(files)
}
