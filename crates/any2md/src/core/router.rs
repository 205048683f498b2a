//! Routing filenames to processors.

use std::sync::Arc;

use crate::core::ingest::file_extension;
use crate::processors::{Processor, processor_for_extension};
use crate::types::SourceFormat;
use crate::{Any2mdError, Result};

/// Resolve the source format for a filename.
///
/// # Errors
///
/// - `Validation` if the filename has no extension
/// - `UnsupportedFormat` if the extension maps to no known family
pub fn source_format_for(filename: &str) -> Result<SourceFormat> {
    let ext = file_extension(filename)
        .ok_or_else(|| Any2mdError::validation(format!("filename has no extension: {}", filename)))?;
    SourceFormat::from_extension(&ext)
        .ok_or_else(|| Any2mdError::UnsupportedFormat(format!("{} (from {})", ext, filename)))
}

/// Resolve the processor for a filename.
///
/// # Errors
///
/// Same as [`source_format_for`], plus `UnsupportedFormat` when the family's
/// processor is compiled out.
pub fn route(filename: &str) -> Result<Arc<dyn Processor>> {
    let ext = file_extension(filename)
        .ok_or_else(|| Any2mdError::validation(format!("filename has no extension: {}", filename)))?;
    processor_for_extension(&ext).ok_or_else(|| {
        Any2mdError::UnsupportedFormat(format!("no processor available for .{}", ext))
    })
}
