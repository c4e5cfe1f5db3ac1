use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, TreeUpdateBuilder};
use git2::{
    Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, FileMode, Oid, PushOptions,
    RemoteCallbacks, Repository as Git2Repo, Status, StatusOptions,
};
use tracing::{debug, warn};

use crate::domain::CommitStamp;
use crate::error::{Result, SyncError};

/// Credential callback attempts before giving up on a remote operation.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Wrapper around git2::Repository with our trait interface
///
/// Paths exchanged through the trait are relative to the directory the
/// repository was opened at, which may be a subdirectory of its working
/// tree.
pub struct Git2Repository {
    repo: Git2Repo,
    /// Opened directory relative to the working tree root
    prefix: PathBuf,
    /// Paths staged through this handle since the last commit
    staged: RefCell<Vec<PathBuf>>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repo::discover(path).map_err(|e| {
            SyncError::resolution(format!(
                "{} is not a git repository: {}",
                path.display(),
                e.message()
            ))
        })?;

        let prefix = match repo.workdir() {
            Some(root) => {
                let root = fs::canonicalize(root)?;
                let opened = fs::canonicalize(path)?;
                opened
                    .strip_prefix(&root)
                    .map(Path::to_path_buf)
                    .unwrap_or_default()
            }
            None => PathBuf::new(),
        };

        let mut repo = Git2Repository::from_git2(repo);
        repo.prefix = prefix;
        Ok(repo)
    }

    /// Create from existing git2::Repository, rooted at its working tree
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo,
            prefix: PathBuf::new(),
            staged: RefCell::new(Vec::new()),
        }
    }

    fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| SyncError::config("bare repositories have no working tree"))
    }

    /// Path relative to the working tree root
    fn repo_path(&self, path: &Path) -> PathBuf {
        self.prefix.join(path)
    }

    /// Tree of HEAD with the staged paths replaced by their index entries.
    /// Everything else staged in the index stays out of the commit.
    fn staged_tree(&self, parent: Option<&git2::Commit<'_>>) -> Result<Oid> {
        let base = match parent {
            Some(commit) => commit.tree()?,
            None => {
                let empty = self.repo.treebuilder(None)?.write()?;
                self.repo.find_tree(empty)?
            }
        };

        let index = self.repo.index()?;
        let mut update = TreeUpdateBuilder::new();
        for path in self.staged.borrow().iter() {
            match index.get_path(path, 0) {
                Some(entry) => {
                    update.upsert(path.as_path(), entry.id, file_mode(entry.mode));
                }
                None => {
                    update.remove(path.as_path());
                }
            }
        }

        Ok(update.create_updated(&self.repo, &base)?)
    }
}

fn file_mode(mode: u32) -> FileMode {
    match mode {
        0o100755 => FileMode::BlobExecutable,
        0o120000 => FileMode::Link,
        _ => FileMode::Blob,
    }
}

/// Remote callbacks trying SSH keys, the SSH agent, then the git credential
/// helper (HTTPS), bounded to a few attempts.
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;

    callbacks.credentials(move |url, username_from_url, allowed_types| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Net,
                format!("authentication failed for {}", url),
            ));
        }

        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(config) = git2::Config::open_default() {
                if let Ok(cred) = Cred::credential_helper(&config, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }

        Cred::default()
    });

    callbacks
}

fn describe_remote_error(action: &str, remote: &str, e: &git2::Error) -> SyncError {
    if e.code() == ErrorCode::Auth {
        SyncError::remote(format!(
            "{} '{}': authentication failed: {}",
            action,
            remote,
            e.message()
        ))
    } else if e.class() == ErrorClass::Net || e.class() == ErrorClass::Http {
        SyncError::remote(format!(
            "{} '{}': network error: {}",
            action,
            remote,
            e.message()
        ))
    } else {
        SyncError::remote(format!("{} '{}': {}", action, remote, e.message()))
    }
}

impl super::Repository for Git2Repository {
    fn resolve_ref(&self, name: &str) -> Result<String> {
        let commit = self
            .repo
            .revparse_single(name)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| SyncError::resolution(format!("'{}': {}", name, e.message())))?;

        Ok(commit.id().to_string())
    }

    fn commit_stamp(&self, commit_id: &str) -> Result<CommitStamp> {
        let oid = Oid::from_str(commit_id)
            .map_err(|e| SyncError::resolution(format!("'{}': {}", commit_id, e.message())))?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| SyncError::resolution(format!("'{}': {}", commit_id, e.message())))?;

        let when = commit.committer().when();
        CommitStamp::from_git_time(commit_id, when.seconds(), when.offset_minutes()).ok_or_else(
            || SyncError::resolution(format!("commit {} has an invalid date", commit_id)),
        )
    }

    fn fetch(&self, remote: &str, branch: &str) -> Result<()> {
        let mut handle = self
            .repo
            .find_remote(remote)
            .map_err(|_| SyncError::remote(format!("Remote '{}' not found", remote)))?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());

        let refspec = format!("+refs/heads/{0}:refs/remotes/{1}/{0}", branch, remote);
        handle
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| describe_remote_error("Failed to fetch from", remote, &e))?;

        debug!(remote, branch, "fetched");
        Ok(())
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(SyncError::checkout("HEAD is detached"));
        }

        head.shorthand()
            .map(|name| name.to_string())
            .ok_or_else(|| SyncError::checkout("branch name is not valid UTF-8"))
    }

    fn status(&self) -> Result<Vec<PathBuf>> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut options))?;
        let paths = statuses
            .iter()
            .filter(|entry| {
                let status = entry.status();
                status != Status::CURRENT && !status.contains(Status::IGNORED)
            })
            .filter_map(|entry| {
                let path = PathBuf::from(entry.path()?);
                path.strip_prefix(&self.prefix).ok().map(Path::to_path_buf)
            })
            .collect();

        Ok(paths)
    }

    fn stage(&self, path: &Path) -> Result<()> {
        let path = self.repo_path(path);
        let mut index = self.repo.index()?;

        if self.workdir()?.join(&path).exists() {
            index.add_path(&path)?;
        } else {
            index.remove_path(&path)?;
        }
        index.write()?;

        debug!(path = %path.display(), "staged");
        self.staged.borrow_mut().push(path);
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        let signature = self.repo.signature().map_err(|e| {
            SyncError::config(format!(
                "git user.name/user.email are not configured: {}",
                e.message()
            ))
        })?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(e.into()),
        };
        let tree = self.repo.find_tree(self.staged_tree(parent.as_ref())?)?;
        let parents: Vec<_> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        self.staged.borrow_mut().clear();

        debug!(commit = %oid, message, "committed");
        Ok(oid.to_string())
    }

    fn is_ahead(&self, remote: &str, branch: &str) -> Result<bool> {
        let local = self
            .repo
            .refname_to_id(&format!("refs/heads/{}", branch))
            .map_err(|e| SyncError::resolution(format!("'{}': {}", branch, e.message())))?;

        let upstream = match self
            .repo
            .refname_to_id(&format!("refs/remotes/{}/{}", remote, branch))
        {
            Ok(id) => id,
            // never pushed or fetched
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };

        let (ahead, _) = self.repo.graph_ahead_behind(local, upstream)?;
        Ok(ahead > 0)
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let mut handle = self
            .repo
            .find_remote(remote)
            .map_err(|_| SyncError::remote(format!("No remote named '{}' found", remote)))?;

        // libgit2 reports per-ref rejections through this callback only
        let rejection: RefCell<Option<String>> = RefCell::new(None);

        {
            let mut callbacks = remote_callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(status) = status {
                    warn!(refname, status, "remote rejected update");
                    *rejection.borrow_mut() = Some(format!("{}: {}", refname, status));
                }
                Ok(())
            });

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);

            let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
            handle
                .push(&[refspec.as_str()], Some(&mut push_options))
                .map_err(|e| describe_remote_error("Failed to push to", remote, &e))?;
        }

        if let Some(reason) = rejection.into_inner() {
            return Err(SyncError::remote(format!(
                "Push to '{}' rejected: {}",
                remote, reason
            )));
        }

        // record what the remote now has, as `git push` does
        let local = self.repo.refname_to_id(&format!("refs/heads/{}", branch))?;
        self.repo.reference(
            &format!("refs/remotes/{}/{}", remote, branch),
            local,
            true,
            "push",
        )?;

        debug!(remote, branch, "pushed");
        Ok(())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", branch);
        let target = self
            .repo
            .revparse_single(&refname)
            .map_err(|_| SyncError::checkout(format!("branch '{}' does not exist", branch)))?;

        let mut builder = CheckoutBuilder::new();
        builder.safe();
        self.repo
            .checkout_tree(&target, Some(&mut builder))
            .map_err(|e| SyncError::checkout(format!("'{}': {}", branch, e.message())))?;
        self.repo.set_head(&refname)?;

        debug!(branch, "checked out");
        Ok(())
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        match self.repo.find_remote(remote) {
            Ok(handle) => Ok(handle.url().map(|url| url.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
