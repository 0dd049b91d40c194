//! Where output goes, and whether we need to produce it at all.

use std::fmt;

use serde::Serialize;

use crate::prelude::*;

/// Prefix marking a file as the OCRed copy of another file.
pub const OCR_PREFIX: &str = "ocr_";

/// Why a file was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The input's name starts with [`OCR_PREFIX`], so it is already output.
    ReservedPrefix,
    /// The output file already exists.
    OutputExists,
    /// The batch was cancelled before this file was reached.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ReservedPrefix => write!(f, "already OCRed"),
            SkipReason::OutputExists => write!(f, "output already exists"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Compute `<output_dir>/ocr_<basename>` for an input file.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let mut file_name = OCR_PREFIX.to_owned();
    if let Some(name) = input.file_name() {
        file_name.push_str(&name.to_string_lossy());
    }
    output_dir.join(file_name)
}

/// Does this file name carry the reserved [`OCR_PREFIX`]? Case-insensitive.
pub fn has_reserved_prefix(input: &Path) -> bool {
    input.file_name().is_some_and(|name| {
        name.to_string_lossy()
            .to_lowercase()
            .starts_with(OCR_PREFIX)
    })
}

/// Should we skip this file? Returns the reason if so.
///
/// This looks at the file system without locking anything, so the answer may
/// be stale by the time we act on it. The OCR step refuses to overwrite an
/// existing output, which makes that harmless.
pub fn should_skip(input: &Path, output_dir: &Path) -> Option<SkipReason> {
    if has_reserved_prefix(input) {
        Some(SkipReason::ReservedPrefix)
    } else if output_path_for(input, output_dir).exists() {
        Some(SkipReason::OutputExists)
    } else {
        None
    }
}
