//! One reconciliation pass
//!
//! A pass resolves the reference branch of the monitored repository,
//! derives the version label, brings the marker file and (optionally) the
//! manifest field to that label, and commits and pushes whatever changed.
//!
//! A resolution failure aborts the pass before any file is touched. A
//! manifest without a version field only skips the manifest step.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::{Config, ManifestConfig};
use crate::domain::{CommitStamp, VersionString};
use crate::error::{Result, SyncError};
use crate::git::Repository;
use crate::publish::{Persisted, Publisher};
use crate::reconcile::{Artifact, Manifest, Marker, Outcome};
use crate::warning::SyncWarning;

/// Result of reconciling and persisting one artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactReport {
    /// Relative to the working repository
    pub path: PathBuf,
    pub outcome: Outcome,
    pub persisted: Persisted,
}

/// Result of a successful pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub commit: CommitStamp,
    pub version: VersionString,
    pub marker: ArtifactReport,
    /// `None` when no manifest is configured or it was skipped this pass
    pub manifest: Option<ArtifactReport>,
    pub warnings: Vec<SyncWarning>,
}

/// Recorded value of an artifact compared with the target, without writing
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub path: PathBuf,
    pub current: Option<String>,
    pub stale: bool,
}

/// What a pass would do
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub commit: CommitStamp,
    pub version: VersionString,
    pub artifacts: Vec<PendingChange>,
    pub warnings: Vec<SyncWarning>,
}

/// Derives the version label from the monitored repository and applies it
/// to the artifacts of the working repository.
pub struct Reconciler<S: Repository, W: Repository> {
    config: Config,
    source: S,
    work: W,
}

impl<S: Repository, W: Repository> Reconciler<S, W> {
    /// # Arguments
    /// * `config` - Validated configuration
    /// * `source` - The monitored repository (only queried)
    /// * `work` - The repository holding the marker and manifest files
    pub fn new(config: Config, source: S, work: W) -> Self {
        Reconciler {
            config,
            source,
            work,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    /// Resolve the reference branch, preferring its remote-tracking ref.
    ///
    /// Fetches first when enabled; a failed fetch is only a warning.
    pub fn resolve(&self, warnings: &mut Vec<SyncWarning>) -> Result<CommitStamp> {
        let source = &self.config.source;
        let branch = source.reference_branch.as_str();

        if self.config.behavior.fetch {
            if let Err(e) = self.source.fetch(&source.remote, branch) {
                warnings.push(SyncWarning::FetchFailed {
                    remote: source.remote.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let remote_ref = format!("{}/{}", source.remote, branch);
        let remote_id = self.source.resolve_ref(&remote_ref).ok();
        let local_id = self.source.resolve_ref(branch).ok();

        if let (Some(remote), Some(local)) = (&remote_id, &local_id) {
            if remote != local {
                info!(
                    local = %short(local),
                    remote = %short(remote),
                    branch,
                    "updates found on remote"
                );
            }
        }

        let id = remote_id.or(local_id).ok_or_else(|| {
            SyncError::resolution(format!(
                "neither '{}' nor '{}' exists in {}",
                remote_ref,
                branch,
                source.repo_path.display()
            ))
        })?;

        self.source.commit_stamp(&id)
    }

    /// Derive the label for the current tip of the reference branch.
    pub fn target_version(
        &self,
        warnings: &mut Vec<SyncWarning>,
    ) -> Result<(CommitStamp, VersionString)> {
        let commit = self.resolve(warnings)?;
        let version = VersionString::from_commit(&self.config.version_prefix, &commit);
        debug!(commit = %commit.id, version = %version, "derived version");
        Ok((commit, version))
    }

    /// Run one full pass.
    pub fn run_pass(&self) -> Result<PassReport> {
        let mut warnings = Vec::new();
        let (commit, version) = self.target_version(&mut warnings)?;

        let marker_path = &self.config.marker.path;
        let marker = Marker::new(self.config.workdir.join(marker_path));
        let marker = self.sync_artifact(&marker, marker_path, &version, &mut warnings)?;

        let manifest = match &self.config.manifest {
            Some(manifest) => self.sync_manifest(manifest, &version, &mut warnings)?,
            None => None,
        };

        Ok(PassReport {
            commit,
            version,
            marker,
            manifest,
            warnings,
        })
    }

    /// Report which artifacts are stale without writing anything.
    ///
    /// A manifest on another branch than the one checked out is not
    /// inspected.
    pub fn preview(&self) -> Result<Preview> {
        let mut warnings = Vec::new();
        let (commit, version) = self.target_version(&mut warnings)?;
        let mut artifacts = Vec::new();

        let marker_path = &self.config.marker.path;
        let marker = Marker::new(self.config.workdir.join(marker_path));
        artifacts.push(pending(marker_path, marker.current()?, &version));

        if let Some(config) = &self.config.manifest {
            if self.on_other_branch(config)? {
                info!(path = %config.path.display(), "manifest is on another branch; not previewed");
            } else {
                let manifest = self.manifest(config)?;
                match manifest.current() {
                    Ok(current) => artifacts.push(pending(&config.path, current, &version)),
                    Err(SyncError::FieldNotFound { .. }) => {
                        warnings.push(SyncWarning::FieldNotFound {
                            path: config.path.clone(),
                        })
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(Preview {
            commit,
            version,
            artifacts,
            warnings,
        })
    }

    fn manifest(&self, config: &ManifestConfig) -> Result<Manifest> {
        Manifest::new(
            self.config.workdir.join(&config.path),
            &self.config.version_prefix,
        )
    }

    fn on_other_branch(&self, config: &ManifestConfig) -> Result<bool> {
        match &config.branch {
            Some(branch) => Ok(self.work.current_branch()? != *branch),
            None => Ok(false),
        }
    }

    fn publisher(&self) -> Publisher<'_, W> {
        Publisher::new(
            &self.work,
            &self.config.source.remote,
            self.config.behavior.push,
        )
    }

    fn sync_artifact(
        &self,
        artifact: &dyn Artifact,
        path: &Path,
        version: &VersionString,
        warnings: &mut Vec<SyncWarning>,
    ) -> Result<ArtifactReport> {
        let outcome = artifact.reconcile(version)?;
        if let Outcome::Changed { old } = &outcome {
            let old_hash = old
                .as_deref()
                .and_then(|value| VersionString::parse(value, version.prefix()));
            info!(
                path = %path.display(),
                old = old_hash.as_ref().map_or("none", |v| v.hash()),
                new = version.hash(),
                "artifact rewritten"
            );
        }

        // also runs when unchanged, to finish work an earlier pass left behind
        let persisted = self
            .publisher()
            .persist(path, &version.to_string(), warnings)?;

        Ok(ArtifactReport {
            path: path.to_path_buf(),
            outcome,
            persisted,
        })
    }

    /// Reconcile the manifest, switching to its branch first when it lives
    /// elsewhere and always switching back afterwards.
    fn sync_manifest(
        &self,
        config: &ManifestConfig,
        version: &VersionString,
        warnings: &mut Vec<SyncWarning>,
    ) -> Result<Option<ArtifactReport>> {
        let manifest = self.manifest(config)?;

        let original = match &config.branch {
            Some(branch) => {
                let current = self.work.current_branch()?;
                if current != *branch {
                    self.work.checkout(branch)?;
                    Some(current)
                } else {
                    None
                }
            }
            None => None,
        };

        let result = self.sync_artifact(&manifest, &config.path, version, warnings);

        if let Some(branch) = original {
            if let Err(e) = self.work.checkout(&branch) {
                error!(branch = %branch, error = %e, "could not switch back");
                return match result {
                    Err(inner) if inner.is_fatal_to_pass() => Err(inner),
                    _ => Err(e),
                };
            }
        }

        match result {
            Ok(report) => Ok(Some(report)),
            Err(SyncError::FieldNotFound { .. }) => {
                warnings.push(SyncWarning::FieldNotFound {
                    path: config.path.clone(),
                });
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn pending(path: &Path, current: Option<String>, version: &VersionString) -> PendingChange {
    let stale = !current.as_deref().is_some_and(|value| version.matches(value));
    PendingChange {
        path: path.to_path_buf(),
        current,
        stale,
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
