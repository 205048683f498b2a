//! Error types for any2md.
//!
//! All fallible operations in the library return [`Result`], which uses
//! [`Any2mdError`]. Errors follow a consistent shape:
//!
//! - `thiserror` provides the `Error` trait implementation
//! - Error chains are preserved with `#[source]` attributes
//! - Messages include context (filenames, limits, sheet names)
//!
//! # Error Handling Philosophy
//!
//! **System errors always bubble up unchanged:**
//! - `Any2mdError::Io` (from `std::io::Error`) - file system and permission errors
//! - These indicate real system problems and are never wrapped or suppressed
//!
//! **Application errors are wrapped with context:**
//! - `Validation` - bad input content, filenames, or option values
//! - `UnsupportedFormat` - file extension outside the supported set
//! - `FileTooLarge` - content exceeds the configured size limit
//! - `Processing` - a document failed to convert
//! - `Engine` - the structure-extraction engine failed (recoverable for PDFs)
//!
//! # Example
//!
//! ```rust
//! use any2md::{Any2mdError, Result};
//!
//! fn check_filename(filename: &str) -> Result<()> {
//!     if filename.is_empty() {
//!         return Err(Any2mdError::validation("filename must not be empty"));
//!     }
//!     Ok(())
//! }
//! ```
use serde::Serialize;
use thiserror::Error;

/// Result type alias using `Any2mdError`.
pub type Result<T> = std::result::Result<T, Any2mdError>;

/// Main error type for all conversion operations.
///
/// # Variants
///
/// - `Io` - File system and I/O errors (always bubble up)
/// - `Validation` - Invalid input content, parameters, or configuration
/// - `UnsupportedFormat` - File extension outside the supported set
/// - `FileTooLarge` - Content exceeds the configured size limit
/// - `Processing` - Document conversion failures (corrupt files, parse errors)
/// - `Engine` - Structure-extraction engine failures
/// - `Serialization` - JSON/TOML serialization errors
/// - `Internal` - Catch-all for unexpected conditions (task panics, poisoned state)
#[derive(Debug, Error)]
pub enum Any2mdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Processing error: {message}")]
    Processing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Engine error: {message}")]
    Engine {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable error codes carried in error response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    UnsupportedFormat,
    FileTooLarge,
    ProcessingFailed,
    InternalError,
}

impl ErrorCode {
    /// HTTP-style status code associated with this error code.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 400,
            ErrorCode::UnsupportedFormat => 400,
            ErrorCode::FileTooLarge => 413,
            ErrorCode::ProcessingFailed => 422,
            ErrorCode::InternalError => 500,
        }
    }

    /// The code as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::ProcessingFailed => "PROCESSING_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl Any2mdError {
    /// Map this error to its stable error code.
    ///
    /// `Processing` and `Engine` both map to `PROCESSING_FAILED`: an engine
    /// failure that reaches the caller means the document could not be
    /// converted, not that the server is broken.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Any2mdError::Validation { .. } => ErrorCode::ValidationError,
            Any2mdError::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            Any2mdError::FileTooLarge(_) => ErrorCode::FileTooLarge,
            Any2mdError::Processing { .. } | Any2mdError::Engine { .. } => ErrorCode::ProcessingFailed,
            Any2mdError::Io(_) | Any2mdError::Serialization { .. } | Any2mdError::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        self.error_code().status_code()
    }
}

impl From<serde_json::Error> for Any2mdError {
    fn from(err: serde_json::Error) -> Self {
        Any2mdError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "excel")]
impl From<calamine::Error> for Any2mdError {
    fn from(err: calamine::Error) -> Self {
        Any2mdError::Processing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(any(feature = "word", feature = "excel"))]
impl From<zip::result::ZipError> for Any2mdError {
    fn from(err: zip::result::ZipError) -> Self {
        Any2mdError::Processing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(any(feature = "word", feature = "excel"))]
impl From<quick_xml::Error> for Any2mdError {
    fn from(err: quick_xml::Error) -> Self {
        Any2mdError::Processing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl Any2mdError {
    error_constructor!(validation, Validation);
    error_constructor!(processing, Processing);
    error_constructor!(engine, Engine);
    error_constructor!(serialization, Serialization);
}
