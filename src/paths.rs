use std::path::{Path, PathBuf};

use crate::errors::{Result, SegBatchError};

pub const OUTPUT_EXTENSION: &str = "png";

/// How output files are laid out under the output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// Every result lands directly in the output root, named after the input stem.
    Flatten,
    /// The input's relative directory structure is reproduced.
    Mirror,
}

impl OutputLayout {
    pub const fn from_keep_structure(keep_structure: bool) -> Self {
        if keep_structure {
            Self::Mirror
        } else {
            Self::Flatten
        }
    }
}

/// Derive the output path for `input`. The result always ends in `.png`.
pub fn map_output(
    input: &Path,
    input_root: &Path,
    output_root: &Path,
    layout: OutputLayout,
) -> Result<PathBuf> {
    let relative = input
        .strip_prefix(input_root)
        .map_err(|_| SegBatchError::FileSystem {
            path: input.to_path_buf(),
            operation: "relative path extraction".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "input file is not within the input directory",
            ),
        })?;

    let stem = relative
        .file_stem()
        .ok_or_else(|| SegBatchError::FileSystem {
            path: input.to_path_buf(),
            operation: "file stem extraction".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        })?;

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(OUTPUT_EXTENSION);

    let output = match layout {
        OutputLayout::Mirror => output_root.join(relative).with_file_name(file_name),
        OutputLayout::Flatten => output_root.join(file_name),
    };
    Ok(output)
}
