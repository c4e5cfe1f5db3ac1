//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the handful of Git
//! operations version-sync needs, so the reconciliation logic never invokes
//! a real Git client directly.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations are:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: An in-memory implementation for testing
//!
//! Two repositories take part in a pass: the monitored repository, which is
//! only queried (fetch, resolve, commit date), and the working repository
//! holding the marker and manifest files, which is also mutated (stage,
//! commit, push, checkout).
//!
//! # Usage
//!
//! ```rust
//! # use version_sync::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> version_sync::Result<()> {
//! let id = repo.resolve_ref("origin/development")?;
//! let stamp = repo.commit_stamp(&id)?;
//! println!("{} committed at {}", stamp.short_id(), stamp.committed_at);
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::{GitCall, MockRepository};
pub use repository::Git2Repository;

use std::path::{Path, PathBuf};

use crate::domain::CommitStamp;
use crate::error::Result;

/// Source-control operations used by a reconciliation pass.
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map lookup
/// failures of refs and commits to [crate::error::SyncError::Resolution],
/// network failures to [crate::error::SyncError::Remote] and branch switches
/// to [crate::error::SyncError::Checkout].
///
/// ## Paths
///
/// Paths passed to [Repository::stage] and returned by [Repository::status]
/// are relative to the directory the repository was opened at. Changes
/// outside that directory are not reported.
pub trait Repository {
    /// Resolve a revision (e.g. "development" or "origin/development") to a
    /// full commit id.
    ///
    /// # Returns
    /// * `Ok(String)` - The 40-character hex commit id
    /// * `Err` - If the revision does not exist or does not point at a commit
    fn resolve_ref(&self, name: &str) -> Result<String>;

    /// Read the committer date of a commit.
    ///
    /// # Arguments
    /// * `commit_id` - Full commit id as returned by [Repository::resolve_ref]
    fn commit_stamp(&self, commit_id: &str) -> Result<CommitStamp>;

    /// Fetch a single branch from a remote into its remote-tracking ref.
    ///
    /// # Example
    /// ```rust
    /// # use version_sync::git::Repository;
    /// # fn example<R: Repository>(repo: &R) -> version_sync::Result<()> {
    /// repo.fetch("origin", "development")?;
    /// let remote_head = repo.resolve_ref("origin/development")?;
    /// # Ok(())
    /// # }
    /// ```
    fn fetch(&self, remote: &str, branch: &str) -> Result<()>;

    /// Name of the currently checked-out branch.
    ///
    /// Fails when HEAD is detached.
    fn current_branch(&self) -> Result<String>;

    /// Paths that differ from HEAD in the working tree or index, including
    /// untracked files. Ignored files are not reported.
    fn status(&self) -> Result<Vec<PathBuf>>;

    /// Stage a single path (add, or remove if it no longer exists).
    fn stage(&self, path: &Path) -> Result<()>;

    /// Commit the paths staged through [Repository::stage] on the current
    /// branch.
    ///
    /// Anything else already staged in the index is left out of the commit
    /// and stays staged.
    ///
    /// # Returns
    /// * `Ok(String)` - Id of the new commit
    fn commit(&self, message: &str) -> Result<String>;

    /// Whether the local branch has commits its remote-tracking branch
    /// lacks. A branch without a remote-tracking ref counts as ahead.
    fn is_ahead(&self, remote: &str, branch: &str) -> Result<bool>;

    /// Push a local branch to the same-named branch on a remote.
    fn push(&self, remote: &str, branch: &str) -> Result<()>;

    /// Check out an existing local branch.
    ///
    /// Refuses to overwrite local modifications.
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Configured URL of a remote, if the remote exists.
    fn remote_url(&self, remote: &str) -> Result<Option<String>>;
}
