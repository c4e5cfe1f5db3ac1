use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::domain::CommitStamp;

/// Number of commit id characters carried in a version label.
pub const HASH_LEN: usize = 7;

/// Date layout of the stamp field (`DD.MM-HH.MM`).
pub const STAMP_FORMAT: &str = "%d.%m-%H.%M";

/// Version label of the form `PREFIX-DD.MM-HH.MM-HASH7`.
///
/// Immutable once constructed. Two labels are equal exactly when their
/// rendered strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionString {
    prefix: String,
    stamp: String,
    hash: String,
}

impl VersionString {
    /// Derive the label for a commit id and its commit date.
    ///
    /// Pure function of its inputs: the first seven characters of the id are
    /// upper-cased, the date is rendered in its own offset.
    pub fn derive(prefix: &str, commit_id: &str, committed_at: &DateTime<FixedOffset>) -> Self {
        let stamp = committed_at.format(STAMP_FORMAT).to_string();
        Self::from_parts(prefix, stamp, commit_id)
    }

    /// Derive the label from a resolved commit.
    pub fn from_commit(prefix: &str, commit: &CommitStamp) -> Self {
        Self::derive(prefix, &commit.id, &commit.committed_at)
    }

    /// Build a label from an already formatted stamp.
    pub fn from_parts(prefix: &str, stamp: impl Into<String>, commit_id: &str) -> Self {
        let hash: String = commit_id.chars().take(HASH_LEN).collect();
        VersionString {
            prefix: prefix.to_string(),
            stamp: stamp.into(),
            hash: hash.to_uppercase(),
        }
    }

    /// Parse a label previously written with `prefix`.
    ///
    /// Returns `None` when the text does not have the
    /// `PREFIX-DD.MM-HH.MM-HASH` shape.
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix(prefix)?.strip_prefix('-')?;
        let (stamp, hash) = rest.rsplit_once('-')?;

        if !is_stamp(stamp) || hash.is_empty() || !hash.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }

        Some(VersionString {
            prefix: prefix.to_string(),
            stamp: stamp.to_string(),
            hash: hash.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The `DD.MM-HH.MM` part.
    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// The upper-cased short commit id.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Whether `text` renders to exactly this label.
    pub fn matches(&self, text: &str) -> bool {
        text == self.to_string()
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.prefix, self.stamp, self.hash)
    }
}

fn is_stamp(text: &str) -> bool {
    // DD.MM-HH.MM
    let bytes = text.as_bytes();
    bytes.len() == 11
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 8 => *b == b'.',
            5 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
