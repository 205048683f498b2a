//! any2md - Document to Markdown Conversion Library
//!
//! any2md converts binary office documents (PDF, Word, Excel) into clean
//! Markdown, HTML, or structured JSON, with image extraction, header/footer
//! filtering, and pagination.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use any2md::{Config, DocumentRequest, convert_request};
//!
//! # #[tokio::main]
//! # async fn main() -> any2md::Result<()> {
//! let config = Config::default();
//! let request = DocumentRequest {
//!     file_content: "file:///tmp/report.pdf".to_string(),
//!     filename: "report.pdf".to_string(),
//!     options: None,
//! };
//! let conversion = convert_request(&request, None, &config).await?;
//! println!("{}", conversion.markdown);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): ingestion, routing, option resolution, single and
//!   batch conversion
//! - **Processors** (`processors`): one backend per document family behind a
//!   shared async trait
//! - **Engine** (`engine`): pluggable document structure analysis with a
//!   native fallback
//! - **Text** (`text`): header/footer filtering and pagination
//! - **API** (`api`): response envelopes for embedders
//!
//! # Features
//!
//! - `pdf`, `word`, `excel`: per-family processors (all on by default)
//! - `full`: everything

#![deny(unsafe_code)]

pub mod api;
pub mod core;
pub mod engine;
pub mod error;
pub mod images;
pub mod output;
pub mod processors;
pub mod text;
pub mod types;

pub use error::{Any2mdError, ErrorCode, Result};
pub use types::*;

pub use core::batch::{BatchItem, BatchOutcome, BatchSummary, batch_convert};
pub use core::config::Config;
pub use core::convert::{DocumentRequest, convert_request};
pub use core::resolver::{RawOptions, ResolvedOptions, resolve_options};
pub use core::router::{route, source_format_for};

pub use engine::{
    EngineOutput, EngineRequest, EngineStatus, StructureEngine, clear_engine, engine, engine_status,
    set_engine,
};

pub use api::{handle_batch_convert, handle_convert};
pub use processors::{Processor, register_processor, registered_processors};
