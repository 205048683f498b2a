//! Envelope-level API: response types and conversion handlers.

pub mod handlers;
pub mod types;

pub use handlers::{BatchBody, BatchItemBody, handle_batch_convert, handle_convert};
pub use types::{ApiErrorResponse, ApiResponse, ErrorBody, generate_request_id};
