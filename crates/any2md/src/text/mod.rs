//! Text post-processing: header/footer removal and pagination.

pub mod headers;
pub mod pagination;
