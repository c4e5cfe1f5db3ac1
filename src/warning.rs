use std::fmt;
use std::path::PathBuf;

/// Non-fatal issues that occur during a reconciliation pass.
/// These are reported to the operator; the pass carries on without them.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncWarning {
    /// Fetching the monitored repository failed; local refs are used
    FetchFailed { remote: String, reason: String },
    /// The manifest has no recognizable version field
    FieldNotFound { path: PathBuf },
    /// Pushing a committed artifact failed; the next pass retries
    PushFailed {
        remote: String,
        branch: String,
        reason: String,
        hint: Option<&'static str>,
    },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::FetchFailed { remote, reason } => {
                write!(
                    f,
                    "Could not fetch from '{}': {}. Using local branch data.",
                    remote, reason
                )
            }
            SyncWarning::FieldNotFound { path } => {
                write!(
                    f,
                    "No version field in {}; manifest skipped this pass",
                    path.display()
                )
            }
            SyncWarning::PushFailed {
                remote,
                branch,
                reason,
                hint,
            } => {
                write!(f, "Push of '{}' to '{}' failed: {}", branch, remote, reason)?;
                if let Some(hint) = hint {
                    write!(f, " ({})", hint)?;
                }
                Ok(())
            }
        }
    }
}

/// Whether a remote error message looks like an authentication or
/// permission failure.
pub fn is_auth_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["auth", "permission", "denied", "403", "401"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Troubleshooting hint for a rejected push, chosen from the remote URL.
pub fn push_hint(remote_url: Option<&str>) -> &'static str {
    match remote_url {
        Some(url) if url.starts_with("https://") || url.starts_with("http://") => {
            "HTTPS remote: refresh the stored credentials or use a personal access token with repo scope"
        }
        Some(url) if url.starts_with("git@") || url.starts_with("ssh://") => {
            "SSH remote: check that your key is loaded in the agent and registered with the host"
        }
        _ => "check the remote configuration (git remote -v) and your access rights",
    }
}
