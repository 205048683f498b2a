//! Core pipeline: configuration, ingestion, routing, option resolution,
//! single and batch conversion.

pub mod batch;
pub mod config;
pub mod convert;
pub mod ingest;
pub mod resolver;
pub mod router;
