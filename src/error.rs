//! Error types for mask composition operations

use thiserror::Error;

/// Result type alias for mask composition operations
pub type Result<T> = std::result::Result<T, MaskEditError>;

/// Error kinds surfaced by the session, catalog and editor
#[derive(Error, Debug)]
pub enum MaskEditError {
    /// A mask, stroke or region disagrees with the image geometry
    #[error("Geometry mismatch in {context}: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    GeometryMismatch {
        context: String,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Operation requested before any image was loaded
    #[error("No active session: {0}")]
    NoActiveSession(String),

    /// Selection requested before segmentation produced a catalog
    #[error("Empty catalog: {0}")]
    EmptyCatalog(String),

    /// Segmentation or generation backend raised an error
    #[error("Backend '{backend}' failed: {message}")]
    BackendFailure { backend: String, message: String },

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected failures inside mask processing
    #[error("Processing error: {0}")]
    Processing(String),
}

impl MaskEditError {
    /// Create a geometry mismatch error from `(width, height)` pairs
    pub fn geometry_mismatch<S: Into<String>>(
        context: S,
        expected: (u32, u32),
        actual: (u32, u32),
    ) -> Self {
        Self::GeometryMismatch {
            context: context.into(),
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        }
    }

    pub fn no_active_session<S: Into<String>>(operation: S) -> Self {
        Self::NoActiveSession(operation.into())
    }

    pub fn empty_catalog<S: Into<String>>(operation: S) -> Self {
        Self::EmptyCatalog(operation.into())
    }

    /// Create a backend failure error with the backend's name
    pub fn backend_failure<B: Into<String>, M: std::fmt::Display>(backend: B, message: M) -> Self {
        Self::BackendFailure {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Whether this error describes a degenerate state that callers should
    /// treat as a no-op rather than a failure
    #[must_use]
    pub fn is_inert(&self) -> bool {
        matches!(self, Self::NoActiveSession(_) | Self::EmptyCatalog(_))
    }
}
