//! Result type alias shared across the workspace.
use crate::error::TraderError;

/// Workspace-wide `Result` alias with `TraderError` as the default error.
pub type Result<T, E = TraderError> = std::result::Result<T, E>;
