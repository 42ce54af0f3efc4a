//! Path normalization for file records and runtime locations.
//!
//! File records are keyed by their normalized path. Normalization is purely
//! lexical (no filesystem access, symlinks are not resolved):
//! - repeated separators collapse
//! - `.` segments are dropped
//! - `..` pops the previous segment where there is one
//! - trailing separators are removed
//!
//! The result is case- and separator-sensitive; two records collide only when
//! their normalized strings are equal.

use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::errors::{MetadataError, MetadataResult};

/// Normalize a data product path for storage in a file record.
pub fn normalize_record_path(raw: &str) -> MetadataResult<String> {
    if raw.trim().is_empty() {
        return Err(MetadataError::invalid_argument("file path must not be empty"));
    }
    let cleaned = Path::new(raw).clean();
    cleaned
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| {
            MetadataError::invalid_argument(format!("file path is not valid UTF-8: {raw}"))
        })
}

/// `normpath({root}/{prefix}/{relative})`.
///
/// `prefix` and `relative` are joined textually, so a leading `/` on either
/// does not discard what precedes it.
pub fn runtime_abspath(root: &Path, prefix: &str, relative: &str) -> PathBuf {
    let joined = format!("{}/{}/{}", root.display(), prefix, relative);
    PathBuf::from(joined).clean()
}
