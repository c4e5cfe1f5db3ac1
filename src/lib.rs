pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod logging;
pub mod orchestration;
pub mod publish;
pub mod reconcile;
pub mod scheduler;
pub mod ui;
pub mod warning;

pub use error::{Result, SyncError};
