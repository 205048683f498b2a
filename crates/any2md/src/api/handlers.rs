//! Envelope-wrapped conversion entry points.
//!
//! These wrap the core pipeline for embedders that want the full response
//! envelope (CLI `--json-envelope`, service adapters). Library users who only
//! need the conversion itself can call [`crate::convert_request`] directly.

use serde::Serialize;
use std::sync::Arc;

use crate::api::types::{ApiErrorResponse, ApiResponse, ErrorBody, generate_request_id};
use crate::core::batch::{BatchSummary, batch_convert};
use crate::core::config::Config;
use crate::core::convert::{DocumentRequest, convert_request};
use crate::core::resolver::RawOptions;
use crate::types::Conversion;

/// Envelope payload for one batch item.
#[derive(Debug, Serialize)]
pub struct BatchItemBody {
    pub index: usize,
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Conversion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Envelope payload for a whole batch.
#[derive(Debug, Serialize)]
pub struct BatchBody {
    pub results: Vec<BatchItemBody>,
    pub summary: BatchSummary,
}

/// Convert one document, producing a success or error envelope.
///
/// Never returns an `Err`: failures become error envelopes with the matching
/// error code and status.
pub async fn handle_convert(
    request: DocumentRequest,
    global_options: Option<RawOptions>,
    config: &Config,
    request_id: Option<String>,
) -> std::result::Result<ApiResponse<Conversion>, ApiErrorResponse> {
    let request_id = request_id.unwrap_or_else(generate_request_id);
    match convert_request(&request, global_options.as_ref(), config).await {
        Ok(conversion) => Ok(ApiResponse::new(
            conversion,
            format!("Converted {}", request.filename),
            Some(request_id),
        )),
        Err(error) => {
            tracing::error!(
                filename = %request.filename,
                code = error.error_code().as_str(),
                request_id = %request_id,
                "Conversion failed: {}",
                error
            );
            Err(ApiErrorResponse::new(&error, config.debug, Some(request_id)))
        }
    }
}

/// Convert a batch of documents into one success envelope.
///
/// The envelope is always a success at the batch level; per-item failures
/// appear inside `results` with their own error bodies. An empty batch is
/// rejected with a validation error envelope.
pub async fn handle_batch_convert(
    documents: Vec<DocumentRequest>,
    global_options: Option<RawOptions>,
    config: Arc<Config>,
    request_id: Option<String>,
) -> std::result::Result<ApiResponse<BatchBody>, ApiErrorResponse> {
    if documents.is_empty() {
        let error = crate::Any2mdError::validation("documents must not be empty");
        return Err(ApiErrorResponse::new(&error, config.debug, request_id));
    }

    let debug = config.debug;
    let outcome = batch_convert(documents, global_options, config).await;

    let results = outcome
        .items
        .into_iter()
        .map(|item| match item.outcome {
            Ok(conversion) => BatchItemBody {
                index: item.index,
                filename: item.filename,
                success: true,
                result: Some(conversion),
                error: None,
            },
            Err(error) => BatchItemBody {
                index: item.index,
                filename: item.filename,
                success: false,
                result: None,
                error: Some(ErrorBody::from_error(&error, debug)),
            },
        })
        .collect();

    let summary = outcome.summary;
    let message = format!(
        "Converted {} of {} documents",
        summary.successful, summary.total
    );
    Ok(ApiResponse::new(BatchBody { results, summary }, message, request_id))
}
