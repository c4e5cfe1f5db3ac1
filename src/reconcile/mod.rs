//! Idempotent application of a version label to on-disk artifacts
//!
//! Each artifact compares its recorded value with the target label and only
//! writes when they differ, so an unchanged artifact never produces a commit.
//!
//! - [marker::Marker] - a file holding exactly one label
//! - [manifest::Manifest] - a `version '...'` field inside a larger text file

pub mod manifest;
pub mod marker;

pub use manifest::{Manifest, ManifestField, Quote};
pub use marker::Marker;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::domain::VersionString;
use crate::error::Result;

/// Result of reconciling one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The artifact already held the target label; nothing was written
    Unchanged,
    /// The artifact was rewritten; `old` is the previous value, if any
    Changed { old: Option<String> },
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Changed { .. })
    }
}

/// A file that records a version label
pub trait Artifact {
    /// Path of the artifact, relative to the working repository
    fn path(&self) -> &Path;

    /// Currently recorded label, `None` if nothing is recorded yet
    fn current(&self) -> Result<Option<String>>;

    /// Bring the artifact to `target`, writing only when it differs
    fn reconcile(&self, target: &VersionString) -> Result<Outcome>;
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory, so readers never observe a truncated or mixed file.
///
/// A symlinked artifact is written through to its target, and the
/// permissions of an existing file are kept.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e.into()),
    };

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    if let Ok(metadata) = fs::metadata(&target) {
        file.as_file().set_permissions(metadata.permissions())?;
    }
    file.as_file().sync_all()?;
    file.persist(&target).map_err(|e| e.error)?;
    Ok(())
}
