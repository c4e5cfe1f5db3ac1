//! Domain logic - pure version rules independent of git operations

pub mod commit;
pub mod version;

pub use commit::CommitStamp;
pub use version::VersionString;
