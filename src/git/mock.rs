use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::CommitStamp;
use crate::error::{Result, SyncError};
use crate::git::Repository;

/// A mutating call recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    Fetch { remote: String, branch: String },
    Stage(PathBuf),
    Commit(String),
    Push { remote: String, branch: String },
    Checkout(String),
}

/// Mock repository for testing without actual git operations
///
/// Refs and commits are set up in memory. When given a working directory,
/// `status` compares the on-disk content of watched files with their last
/// committed content, and `commit` records the staged files' current
/// content as committed. A commit leaves the branch ahead until a push
/// succeeds.
pub struct MockRepository {
    refs: HashMap<String, String>,
    commits: HashMap<String, CommitStamp>,
    remotes: HashMap<String, String>,
    workdir: Option<PathBuf>,
    committed: RefCell<BTreeMap<PathBuf, Option<String>>>,
    staged: RefCell<Vec<PathBuf>>,
    branch: RefCell<String>,
    calls: RefCell<Vec<GitCall>>,
    fail_fetch: bool,
    fail_push: RefCell<Option<String>>,
    fail_checkout: bool,
    ahead: RefCell<bool>,
}

impl MockRepository {
    /// Create a new empty mock repository on branch "main"
    pub fn new() -> Self {
        MockRepository {
            refs: HashMap::new(),
            commits: HashMap::new(),
            remotes: HashMap::new(),
            workdir: None,
            committed: RefCell::new(BTreeMap::new()),
            staged: RefCell::new(Vec::new()),
            branch: RefCell::new("main".to_string()),
            calls: RefCell::new(Vec::new()),
            fail_fetch: false,
            fail_push: RefCell::new(None),
            fail_checkout: false,
            ahead: RefCell::new(false),
        }
    }

    /// Point a ref at a commit and register the commit
    pub fn set_ref(&mut self, name: impl Into<String>, commit: CommitStamp) {
        self.refs.insert(name.into(), commit.id.clone());
        self.commits.insert(commit.id.clone(), commit);
    }

    /// Set the checked-out branch
    pub fn set_branch(&mut self, branch: impl Into<String>) {
        *self.branch.get_mut() = branch.into();
    }

    /// Add a remote with its URL
    pub fn add_remote(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.remotes.insert(name.into(), url.into());
    }

    /// Use a real directory as the working tree
    pub fn set_workdir(&mut self, path: impl Into<PathBuf>) {
        self.workdir = Some(path.into());
    }

    /// Track a file with its last committed content (`None` = untracked)
    pub fn watch(&mut self, path: impl Into<PathBuf>, committed: Option<&str>) {
        self.committed
            .get_mut()
            .insert(path.into(), committed.map(|s| s.to_string()));
    }

    pub fn fail_fetch(&mut self) {
        self.fail_fetch = true;
    }

    /// Make every push fail with the given message
    pub fn fail_push(&mut self, message: impl Into<String>) {
        *self.fail_push.get_mut() = Some(message.into());
    }

    /// Let pushes succeed again
    pub fn restore_push(&self) {
        *self.fail_push.borrow_mut() = None;
    }

    /// Mark the current branch as having unpushed commits
    pub fn set_ahead(&mut self, ahead: bool) {
        *self.ahead.get_mut() = ahead;
    }

    pub fn fail_checkout(&mut self) {
        self.fail_checkout = true;
    }

    /// Mutating calls in the order they were made
    pub fn calls(&self) -> Vec<GitCall> {
        self.calls.borrow().clone()
    }

    /// Last committed content of a watched file
    pub fn committed_content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.committed.borrow().get(path.as_ref()).cloned().flatten()
    }

    fn record(&self, call: GitCall) {
        self.calls.borrow_mut().push(call);
    }

    fn read_workdir(&self, path: &Path) -> Option<String> {
        let workdir = self.workdir.as_ref()?;
        fs::read_to_string(workdir.join(path)).ok()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn resolve_ref(&self, name: &str) -> Result<String> {
        self.refs
            .get(name)
            .cloned()
            .ok_or_else(|| SyncError::resolution(format!("'{}': reference not found", name)))
    }

    fn commit_stamp(&self, commit_id: &str) -> Result<CommitStamp> {
        self.commits
            .get(commit_id)
            .cloned()
            .ok_or_else(|| SyncError::resolution(format!("'{}': commit not found", commit_id)))
    }

    fn fetch(&self, remote: &str, branch: &str) -> Result<()> {
        self.record(GitCall::Fetch {
            remote: remote.to_string(),
            branch: branch.to_string(),
        });
        if self.fail_fetch {
            return Err(SyncError::remote(format!(
                "Failed to fetch from '{}': network unreachable",
                remote
            )));
        }
        Ok(())
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.borrow().clone())
    }

    fn status(&self) -> Result<Vec<PathBuf>> {
        let committed = self.committed.borrow();
        let dirty = committed
            .iter()
            .filter(|(path, content)| self.read_workdir(path) != **content)
            .map(|(path, _)| path.clone())
            .collect();
        Ok(dirty)
    }

    fn stage(&self, path: &Path) -> Result<()> {
        self.record(GitCall::Stage(path.to_path_buf()));
        self.staged.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        self.record(GitCall::Commit(message.to_string()));

        let staged: Vec<PathBuf> = self.staged.borrow_mut().drain(..).collect();
        let mut committed = self.committed.borrow_mut();
        for path in staged {
            let content = self.read_workdir(&path);
            committed.insert(path, content);
        }

        *self.ahead.borrow_mut() = true;
        Ok(format!("{:040x}", self.calls.borrow().len()))
    }

    fn is_ahead(&self, _remote: &str, _branch: &str) -> Result<bool> {
        Ok(*self.ahead.borrow())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.record(GitCall::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
        });
        if let Some(message) = self.fail_push.borrow().as_ref() {
            return Err(SyncError::remote(message.clone()));
        }
        *self.ahead.borrow_mut() = false;
        Ok(())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.record(GitCall::Checkout(branch.to_string()));
        if self.fail_checkout {
            return Err(SyncError::checkout(format!("'{}': conflicts", branch)));
        }
        *self.branch.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        Ok(self.remotes.get(remote).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stamp(id: &str) -> CommitStamp {
        CommitStamp::from_git_time(id, 1_741_185_000, 0).unwrap()
    }

    #[test]
    fn test_mock_repository_refs() {
        let mut repo = MockRepository::new();
        repo.set_ref("origin/development", stamp("a1b2c3d4e5f6"));

        assert_eq!(
            repo.resolve_ref("origin/development").unwrap(),
            "a1b2c3d4e5f6"
        );
        assert_eq!(repo.commit_stamp("a1b2c3d4e5f6").unwrap().id, "a1b2c3d4e5f6");
        assert!(repo.resolve_ref("development").is_err());
    }

    #[test]
    fn test_mock_status_follows_disk() {
        let dir = TempDir::new().unwrap();
        let mut repo = MockRepository::new();
        repo.set_workdir(dir.path());
        repo.watch("marker", Some("old"));

        fs::write(dir.path().join("marker"), "old").unwrap();
        assert!(repo.status().unwrap().is_empty());

        fs::write(dir.path().join("marker"), "new").unwrap();
        assert_eq!(repo.status().unwrap(), vec![PathBuf::from("marker")]);

        repo.stage(Path::new("marker")).unwrap();
        repo.commit("new").unwrap();
        assert!(repo.status().unwrap().is_empty());
        assert_eq!(repo.committed_content("marker"), Some("new".to_string()));
    }

    #[test]
    fn test_mock_records_calls() {
        let repo = MockRepository::new();
        repo.checkout("release").unwrap();
        repo.push("origin", "release").unwrap();

        assert_eq!(repo.current_branch().unwrap(), "release");
        assert_eq!(
            repo.calls(),
            vec![
                GitCall::Checkout("release".to_string()),
                GitCall::Push {
                    remote: "origin".to_string(),
                    branch: "release".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_mock_failures() {
        let mut repo = MockRepository::new();
        repo.fail_fetch();
        repo.fail_push("403 Permission denied");

        assert!(repo.fetch("origin", "main").is_err());
        assert!(repo.push("origin", "main").unwrap_err().to_string().contains("403"));
    }
}
