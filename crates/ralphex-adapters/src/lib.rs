//! # ralphex-adapters
//!
//! External-process adapters for ralphex:
//! - `CommandExecutor` runs the assistant/reviewer CLI and streams its output
//! - `Repo` shells out to git for the run-boundary source-control operations

pub mod executor;
pub mod git;

pub use executor::CommandExecutor;
pub use git::{GitError, Repo};
