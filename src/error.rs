use std::path::PathBuf;

use thiserror::Error;

/// Failures the binaries need to tell apart. Everything else travels as a plain
/// [`anyhow::Error`] with context attached.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("{command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Required command '{0}' is not available")]
    ToolMissing(String),

    #[error("Invalid semantic version: {0}")]
    InvalidVersion(String),

    #[error("Could not find [package].version in {}", .0.display())]
    MissingPackageVersion(PathBuf),

    #[error("No updater endpoint configured in {}", .0.display())]
    MissingEndpoint(PathBuf),

    #[error("Version update failed consistency checks: {0}")]
    Consistency(String),

    #[error("Tag {0} already exists locally.")]
    TagExists(String),

    #[error("Aborted by user.")]
    Interrupted,
}

impl ReleaseError {
    /// Whether `err` (or anything it wraps) is a user interrupt.
    pub fn is_interrupt(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<ReleaseError>(),
                Some(ReleaseError::Interrupted)
            )
        })
    }
}
