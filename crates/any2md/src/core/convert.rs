//! Single-document conversion entry point.

use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::ingest::{
    decode_content, validate_decoded_size, validate_file_format, validate_file_size,
};
use crate::core::resolver::{RawOptions, resolve_options};
use crate::core::router::{route, source_format_for};
use crate::types::Conversion;
use crate::Result;

/// One document to convert: content (base64, `file://` reference, or raw
/// text), its filename, and optional per-file options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub file_content: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RawOptions>,
}

/// Convert a single document request.
///
/// Validation order matters: filename and format checks run before the
/// (potentially large) content is decoded, and the size check uses the
/// estimated decoded size so oversized payloads are rejected cheaply. The
/// size is checked again on the decoded bytes, since a `file://` reference
/// hides its real size behind a short string.
///
/// # Errors
///
/// Any pipeline error: `Validation`, `UnsupportedFormat`, `FileTooLarge`,
/// `Processing`, or `Io`.
pub async fn convert_request(
    request: &DocumentRequest,
    global_options: Option<&RawOptions>,
    config: &Config,
) -> Result<Conversion> {
    validate_file_format(&request.filename, &config.allowed_file_types)?;
    validate_file_size(&request.file_content, config.max_file_size)?;

    let format = source_format_for(&request.filename)?;
    let options = resolve_options(request.options.as_ref(), global_options, format)?;
    let decoded = decode_content(&request.file_content).await?;
    validate_decoded_size(decoded.bytes.len() as u64, config.max_file_size)?;

    tracing::debug!(
        filename = %request.filename,
        format = format.as_str(),
        size = decoded.bytes.len(),
        "Converting document"
    );

    let processor = route(&request.filename)?;
    let mut conversion = processor
        .convert(&decoded.bytes, &request.filename, &options, config)
        .await?;

    if !options.include_content {
        conversion.markdown.clear();
        conversion.html = None;
        conversion.pages = None;
        if let Some(serde_json::Value::Object(map)) = conversion.json.as_mut() {
            map.insert("content".to_string(), serde_json::Value::String(String::new()));
            map.remove("pages");
        }
    }
    Ok(conversion)
}
