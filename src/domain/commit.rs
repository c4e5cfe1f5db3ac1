use chrono::{DateTime, FixedOffset};

/// A resolved commit: full id plus committer date in the commit's own offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStamp {
    pub id: String,
    pub committed_at: DateTime<FixedOffset>,
}

impl CommitStamp {
    pub fn new(id: impl Into<String>, committed_at: DateTime<FixedOffset>) -> Self {
        CommitStamp {
            id: id.into(),
            committed_at,
        }
    }

    /// Build from raw git time (seconds since epoch, offset in minutes).
    pub fn from_git_time(id: impl Into<String>, seconds: i64, offset_minutes: i32) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_minutes * 60)?;
        let utc = DateTime::from_timestamp(seconds, 0)?;
        Some(CommitStamp::new(id, utc.with_timezone(&offset)))
    }

    /// First eight characters of the id, for log output.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}
