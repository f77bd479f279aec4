//! Error taxonomy for package operations.
//!
//! Operations return `anyhow::Result`. The typed errors below travel inside
//! `anyhow::Error` and are recovered with `downcast_ref`, so callers can tell
//! a bad package reference from a tool failure or an aborted call.

use thiserror::Error;

/// The package reference was empty or could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid package spec: {0}")]
pub struct InvalidSpecError(pub String);

/// The external tool exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe_process_error(.exit_code, .stderr))]
pub struct ProcessError {
    /// Exit code, absent when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Accumulated stderr text without `WARNING` lines.
    pub stderr: String,
}

fn describe_process_error(exit_code: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    match (exit_code, stderr.is_empty()) {
        (Some(code), true) => format!("Process exited with code {}", code),
        (None, true) => "Process terminated by signal".to_string(),
        (_, false) => stderr.to_string(),
    }
}

/// The search response did not contain a results list at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No results found for '{keyword}'")]
pub struct NoResultError {
    pub keyword: String,
}

/// The operation was aborted through its cancellation token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Operation cancelled")]
pub struct CancelledError;

/// Returns true if the error chain carries a [`CancelledError`].
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CancelledError>().is_some()
}

/// Returns true if the error chain carries a [`NoResultError`].
pub fn is_no_result(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NoResultError>().is_some()
}
