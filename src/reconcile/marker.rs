use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{write_atomic, Artifact, Outcome};
use crate::domain::VersionString;
use crate::error::Result;

/// Plain text file whose whole content is one version label
#[derive(Debug, Clone)]
pub struct Marker {
    path: PathBuf,
}

impl Marker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Marker { path: path.into() }
    }
}

impl Artifact for Marker {
    fn path(&self) -> &Path {
        &self.path
    }

    /// Trimmed file content; an absent file records nothing.
    fn current(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn reconcile(&self, target: &VersionString) -> Result<Outcome> {
        let current = self.current()?;
        if current.as_deref().is_some_and(|value| target.matches(value)) {
            return Ok(Outcome::Unchanged);
        }

        write_atomic(&self.path, &target.to_string())?;
        debug!(path = %self.path.display(), old = ?current, new = %target, "marker updated");

        Ok(Outcome::Changed { old: current })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn target() -> VersionString {
        VersionString::from_parts("HYPE", "05.03-14.30", "a1b2c3d4e5f6")
    }

    #[test]
    fn test_absent_marker_is_created() {
        let dir = TempDir::new().unwrap();
        let marker = Marker::new(dir.path().join("hype_maps"));

        assert_eq!(marker.current().unwrap(), None);
        assert_eq!(
            marker.reconcile(&target()).unwrap(),
            Outcome::Changed { old: None }
        );
        assert_eq!(
            fs::read_to_string(marker.path()).unwrap(),
            "HYPE-05.03-14.30-A1B2C3D"
        );
    }

    #[test]
    fn test_second_reconcile_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let marker = Marker::new(dir.path().join("hype_maps"));

        assert!(marker.reconcile(&target()).unwrap().is_changed());
        assert_eq!(marker.reconcile(&target()).unwrap(), Outcome::Unchanged);
        assert_eq!(
            fs::read(marker.path()).unwrap(),
            b"HYPE-05.03-14.30-A1B2C3D".to_vec()
        );
    }

    #[test]
    fn test_stale_marker_reports_old_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hype_maps");
        fs::write(&path, "HYPE-05.03-14.30-OLDHASH").unwrap();

        let outcome = Marker::new(&path).reconcile(&target()).unwrap();

        assert_eq!(
            outcome,
            Outcome::Changed {
                old: Some("HYPE-05.03-14.30-OLDHASH".to_string())
            }
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "HYPE-05.03-14.30-A1B2C3D"
        );
    }

    #[test]
    fn test_trailing_newline_is_not_a_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hype_maps");
        fs::write(&path, "HYPE-05.03-14.30-A1B2C3D\n").unwrap();

        assert_eq!(Marker::new(&path).reconcile(&target()).unwrap(), Outcome::Unchanged);
        // untouched
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "HYPE-05.03-14.30-A1B2C3D\n"
        );
    }

    #[test]
    fn test_garbage_marker_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hype_maps");
        fs::write(&path, "not a version").unwrap();

        let outcome = Marker::new(&path).reconcile(&target()).unwrap();
        assert_eq!(
            outcome,
            Outcome::Changed {
                old: Some("not a version".to_string())
            }
        );
    }
}
