//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering and export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Surface allocation failed.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Resource loading failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Encoding an output format failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Error from the core model.
    #[error(transparent)]
    Studio(#[from] studio_core::StudioError),
}
