//! convoy-source - Git-backed source synchronization
//!
//! Wraps the `git` CLI to fetch a remote and pin the working tree to an
//! exact revision before a rollout.

pub mod error;
pub mod git;

pub use error::SyncError;
pub use git::GitWorkspace;
