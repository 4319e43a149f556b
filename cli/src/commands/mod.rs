//! Command implementations.
//!
//! Each command prints a human-readable summary on stdout and reports
//! whether it completed or was cancelled at the confirmation gate. Errors
//! travel separately; only `main` turns them into an exit code.

pub mod backup;
pub mod clear;
pub mod migrate;
pub mod restore;

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    Cancelled,
}
