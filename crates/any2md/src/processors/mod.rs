//! Format processors and their shared contract.
//!
//! Each supported document family implements [`Processor`]. Processors are
//! registered once into a process-wide registry; the router looks them up by
//! file extension.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::resolver::ResolvedOptions;
use crate::types::Conversion;
use crate::Result;

#[cfg(feature = "excel")]
pub mod excel;
#[cfg(any(feature = "word", feature = "excel"))]
pub mod office_meta;
#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "word")]
pub mod word;

/// A document-family conversion backend.
///
/// Implementations own the full pipeline for their family: parse, filter
/// headers/footers, embed images, paginate, and format output. They receive
/// fully resolved options; option merging happens upstream.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Short stable name, used in logs and registry lookups.
    fn name(&self) -> &str;

    /// Lowercased extensions this processor accepts.
    fn supported_extensions(&self) -> &[&str];

    /// Convert a document.
    ///
    /// # Errors
    ///
    /// Returns `Processing` for unreadable or corrupt documents,
    /// `UnsupportedFormat` for extensions the family cannot actually handle
    /// (e.g. legacy `.doc`).
    async fn convert(
        &self,
        content: &[u8],
        filename: &str,
        options: &ResolvedOptions,
        config: &Config,
    ) -> Result<Conversion>;
}

static REGISTRY: Lazy<RwLock<Vec<Arc<dyn Processor>>>> = Lazy::new(|| RwLock::new(Vec::new()));
static INIT: std::sync::Once = std::sync::Once::new();

/// Register the built-in processors. Idempotent.
pub fn ensure_initialized() {
    INIT.call_once(|| {
        let mut registry = REGISTRY.write();
        #[cfg(feature = "pdf")]
        registry.push(Arc::new(pdf::PdfProcessor::new()) as Arc<dyn Processor>);
        #[cfg(feature = "word")]
        registry.push(Arc::new(word::WordProcessor::new()) as Arc<dyn Processor>);
        #[cfg(feature = "excel")]
        registry.push(Arc::new(excel::ExcelProcessor::new()) as Arc<dyn Processor>);
        tracing::debug!(count = registry.len(), "Registered processors");
    });
}

/// Register a custom processor ahead of the built-ins.
pub fn register_processor(processor: Arc<dyn Processor>) {
    ensure_initialized();
    REGISTRY.write().insert(0, processor);
}

/// Find a processor for a lowercased extension.
pub fn processor_for_extension(ext: &str) -> Option<Arc<dyn Processor>> {
    ensure_initialized();
    REGISTRY
        .read()
        .iter()
        .find(|p| p.supported_extensions().contains(&ext))
        .cloned()
}

/// Names and extensions of all registered processors.
pub fn registered_processors() -> Vec<(String, Vec<String>)> {
    ensure_initialized();
    REGISTRY
        .read()
        .iter()
        .map(|p| {
            (
                p.name().to_string(),
                p.supported_extensions().iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}
