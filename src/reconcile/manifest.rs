use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use super::{write_atomic, Artifact, Outcome};
use crate::domain::VersionString;
use crate::error::{Result, SyncError};

/// Quote character around a manifest value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

/// Location of the version value inside a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestField {
    /// The value between the quotes
    pub value: String,
    pub quote: Quote,
    /// Byte range of the value, quotes excluded
    pub span: Range<usize>,
}

/// A `version '<PREFIX>-...'` assignment inside a line-oriented text file.
///
/// `version` must be the first word on its line, so keys such as
/// `my-version` or `.version` never match.
///
/// Only the first matching line is ever read or rewritten. Every byte
/// outside the quoted value, line endings included, is passed through.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    pattern: Regex,
}

impl Manifest {
    pub fn new(path: impl Into<PathBuf>, prefix: &str) -> Result<Self> {
        let prefix = regex::escape(prefix);
        let pattern = Regex::new(&format!(
            r#"(?m)^[ \t]*version[ \t]+(?:'(?P<single>{0}-[^'"\r\n]+)'|"(?P<double>{0}-[^'"\r\n]+)")"#,
            prefix
        ))
        .map_err(|e| SyncError::config(format!("invalid version prefix: {}", e)))?;

        Ok(Manifest {
            path: path.into(),
            pattern,
        })
    }

    /// Find the first version field in `content`.
    pub fn locate(&self, content: &str) -> Option<ManifestField> {
        let captures = self.pattern.captures(content)?;
        let (found, quote) = match captures.name("single") {
            Some(m) => (m, Quote::Single),
            None => (captures.name("double")?, Quote::Double),
        };

        Some(ManifestField {
            value: found.as_str().to_string(),
            quote,
            span: found.range(),
        })
    }

    fn read(&self) -> Result<(String, ManifestField)> {
        let content = fs::read_to_string(&self.path)?;
        let field = self.locate(&content).ok_or_else(|| SyncError::FieldNotFound {
            path: self.path.clone(),
        })?;
        Ok((content, field))
    }
}

/// Replace the value of `field` in `content` with `value`.
pub fn apply(content: &str, field: &ManifestField, value: &str) -> String {
    let mut updated = String::with_capacity(content.len() - field.span.len() + value.len());
    updated.push_str(&content[..field.span.start]);
    updated.push_str(value);
    updated.push_str(&content[field.span.end..]);
    updated
}

impl Artifact for Manifest {
    fn path(&self) -> &Path {
        &self.path
    }

    /// Fails with [SyncError::FieldNotFound] when no field matches.
    fn current(&self) -> Result<Option<String>> {
        let (_, field) = self.read()?;
        Ok(Some(field.value))
    }

    fn reconcile(&self, target: &VersionString) -> Result<Outcome> {
        let (content, field) = self.read()?;
        if target.matches(&field.value) {
            return Ok(Outcome::Unchanged);
        }

        let updated = apply(&content, &field, &target.to_string());
        write_atomic(&self.path, &updated)?;
        debug!(
            path = %self.path.display(),
            old = %field.value,
            new = %target,
            quote = ?field.quote,
            "manifest updated"
        );

        Ok(Outcome::Changed {
            old: Some(field.value),
        })
    }
}
