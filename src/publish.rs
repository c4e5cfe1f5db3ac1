//! Persisting a reconciled artifact upstream: stage, commit, push.
//!
//! Every pass asks git for leftover work as well: a rewrite that was never
//! committed is committed, and local commits that never reached the remote
//! are pushed. Push failures do not fail the pass. They become a
//! [SyncWarning] and are retried on the next pass.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::git::Repository;
use crate::warning::{is_auth_failure, push_hint, SyncWarning};

/// What happened to an artifact after reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted {
    /// Nothing to commit or push
    Skipped,
    /// The artifact was committed; `pushed` is false when pushing is
    /// disabled or failed
    Committed { commit: String, pushed: bool },
    /// No new commit; earlier unpushed commits were pushed again
    Resent { pushed: bool },
}

/// Stages, commits and pushes single files in the working repository
pub struct Publisher<'a, R: Repository> {
    repo: &'a R,
    remote: &'a str,
    push: bool,
}

impl<'a, R: Repository> Publisher<'a, R> {
    pub fn new(repo: &'a R, remote: &'a str, push: bool) -> Self {
        Publisher { repo, remote, push }
    }

    /// Whether git reports `path` as modified or untracked.
    pub fn is_pending(&self, path: &Path) -> Result<bool> {
        Ok(self.repo.status()?.iter().any(|p| p == path))
    }

    /// Commit `path` alone with `message` when git reports it modified, then
    /// push the current branch if it is ahead of the remote.
    ///
    /// Push failures are appended to `warnings` instead of being returned.
    pub fn persist(
        &self,
        path: &Path,
        message: &str,
        warnings: &mut Vec<SyncWarning>,
    ) -> Result<Persisted> {
        if !self.is_pending(path)? {
            if !self.push {
                return Ok(Persisted::Skipped);
            }
            let branch = self.repo.current_branch()?;
            if !self.repo.is_ahead(self.remote, &branch)? {
                debug!(path = %path.display(), "nothing to commit or push");
                return Ok(Persisted::Skipped);
            }
            info!(remote = self.remote, branch = %branch, "pushing earlier commits");
            let pushed = self.push_branch(&branch, warnings);
            return Ok(Persisted::Resent { pushed });
        }

        self.repo.stage(path)?;
        let commit = self.repo.commit(message)?;
        info!(path = %path.display(), commit = %commit, message, "committed");

        if !self.push {
            return Ok(Persisted::Committed {
                commit,
                pushed: false,
            });
        }

        let branch = self.repo.current_branch()?;
        let pushed = self.push_branch(&branch, warnings);
        Ok(Persisted::Committed { commit, pushed })
    }

    fn push_branch(&self, branch: &str, warnings: &mut Vec<SyncWarning>) -> bool {
        let error = match self.repo.push(self.remote, branch) {
            Ok(()) => return true,
            Err(e) => e,
        };

        let reason = error.to_string();
        warn!(remote = self.remote, branch, error = %reason, "push failed");

        let hint = if is_auth_failure(&reason) {
            let url = self.repo.remote_url(self.remote).unwrap_or(None);
            Some(push_hint(url.as_deref()))
        } else {
            None
        };
        warnings.push(SyncWarning::PushFailed {
            remote: self.remote.to_string(),
            branch: branch.to_string(),
            reason,
            hint,
        });
        false
    }
}
