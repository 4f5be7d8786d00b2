//! Error types for studio operations.

use thiserror::Error;

/// Result type for studio operations.
pub type StudioResult<T> = Result<T, StudioError>;

/// Errors that can occur in studio operations.
///
/// Tool handlers never return these; they fail closed instead. Errors only
/// surface at the host boundary (parsing identifiers, loading projects,
/// allocating surfaces).
#[derive(Debug, Error)]
pub enum StudioError {
    /// Layer not found in project.
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// Invalid project or layer operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Unknown tool identifier.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Unknown length unit.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// Colour string could not be parsed.
    #[error("Invalid colour: {0}")]
    InvalidColor(String),

    /// Project serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Embedded raster data could not be decoded or encoded.
    #[error("Image data error: {0}")]
    ImageData(String),

    /// Background region-grow worker failed.
    #[error("Worker error: {0}")]
    Worker(String),
}
