//! The structure-extraction engine boundary.
//!
//! Layout analysis is delegated to an engine behind [`StructureEngine`]: give
//! it a file path and conversion hints, get back markdown, any images it
//! recovered, and engine-specific metadata. The default implementation is a
//! native PDF text extractor; deployments with an ML layout model install
//! their own engine via [`set_engine`].
//!
//! The engine is a shared, expensive resource. It is initialized lazily on
//! first use, guarded by an async lock so concurrent first calls initialize
//! it exactly once.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::{Any2mdError, Result};

/// Conversion hints passed to the engine.
#[derive(Debug, Clone, Default)]
pub struct EngineRequest {
    /// Language hints, e.g. `["auto"]` or `["en", "de"]`.
    pub languages: Vec<String>,
    /// First page to analyze, 0-based.
    pub start_page: usize,
    /// Exclusive end page; `None` analyzes to the end.
    pub end_page: Option<usize>,
    /// Whether the engine should return recovered images.
    pub extract_images: bool,
}

/// An image recovered by the engine.
#[derive(Debug, Clone)]
pub struct EngineImage {
    pub data: Vec<u8>,
    pub page_number: usize,
    pub index: usize,
}

/// Engine analysis result.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    /// Markdown with `## Page N` section markers.
    pub markdown: String,
    pub images: Vec<EngineImage>,
    /// Engine-specific metadata (page count, model info, timings).
    pub metadata: serde_json::Value,
}

/// Opaque layout-analysis engine.
///
/// Implementations must be cheap to call after construction; any heavy model
/// loading belongs in the constructor so the lazy global init pays the cost
/// exactly once.
#[async_trait]
pub trait StructureEngine: Send + Sync {
    /// Analyze the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Engine` for analysis failures. Callers on the PDF path treat
    /// `Engine` errors as recoverable and fall back to native extraction.
    async fn analyze(&self, path: &Path, request: &EngineRequest) -> Result<EngineOutput>;

    fn name(&self) -> &str;
}

static ENGINE_SLOT: Lazy<RwLock<Option<Arc<dyn StructureEngine>>>> = Lazy::new(|| RwLock::new(None));
static INIT_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Get the shared engine, initializing the default on first call.
///
/// Double-checked: the fast path is a read lock; initialization serializes
/// behind an async mutex so racing callers wait instead of double-loading.
///
/// # Errors
///
/// Returns `Engine` if no engine is installed and the default cannot be
/// constructed.
pub async fn engine() -> Result<Arc<dyn StructureEngine>> {
    if let Some(engine) = ENGINE_SLOT.read().clone() {
        return Ok(engine);
    }

    let _guard = INIT_LOCK.lock().await;
    if let Some(engine) = ENGINE_SLOT.read().clone() {
        return Ok(engine);
    }

    let engine = default_engine()?;
    tracing::info!(engine = engine.name(), "Initialized structure engine");
    *ENGINE_SLOT.write() = Some(engine.clone());
    Ok(engine)
}

/// Install a custom engine, replacing any current one.
pub fn set_engine(engine: Arc<dyn StructureEngine>) {
    *ENGINE_SLOT.write() = Some(engine);
}

/// Drop the installed engine so the next call re-initializes.
///
/// Intended for tests that need a pristine slot.
pub fn clear_engine() {
    *ENGINE_SLOT.write() = None;
}

/// Engine slot status for introspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Report whether an engine is initialized, without initializing one.
pub fn engine_status() -> EngineStatus {
    let slot = ENGINE_SLOT.read();
    EngineStatus {
        initialized: slot.is_some(),
        name: slot.as_ref().map(|e| e.name().to_string()),
    }
}

#[cfg(feature = "pdf")]
fn default_engine() -> Result<Arc<dyn StructureEngine>> {
    Ok(Arc::new(native::NativePdfEngine))
}

#[cfg(not(feature = "pdf"))]
fn default_engine() -> Result<Arc<dyn StructureEngine>> {
    Err(Any2mdError::engine(
        "no structure engine installed and no default available",
    ))
}

#[cfg(feature = "pdf")]
pub mod native {
    //! Default engine: native PDF text extraction via lopdf.

    use super::*;

    /// Pure-Rust PDF text engine. No layout model; text is emitted in
    /// content-stream order under per-page markers.
    pub struct NativePdfEngine;

    #[async_trait]
    impl StructureEngine for NativePdfEngine {
        async fn analyze(&self, path: &Path, request: &EngineRequest) -> Result<EngineOutput> {
            let bytes = tokio::fs::read(path).await.map_err(Any2mdError::Io)?;
            let request = request.clone();

            tokio::task::spawn_blocking(move || analyze_bytes(&bytes, &request))
                .await
                .map_err(|e| Any2mdError::engine(format!("engine task failed: {}", e)))?
        }

        fn name(&self) -> &str {
            "native-lopdf"
        }
    }

    fn analyze_bytes(bytes: &[u8], request: &EngineRequest) -> Result<EngineOutput> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| Any2mdError::engine_with_source("failed to load PDF", e))?;

        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        let page_count = pages.len();
        let end = request.end_page.unwrap_or(page_count).min(page_count);
        let start = request.start_page.min(end);

        let mut markdown = String::new();
        for (offset, page_num) in pages[start..end].iter().enumerate() {
            let text = doc.extract_text(&[*page_num]).unwrap_or_default();
            if offset > 0 {
                markdown.push_str("\n\n");
            }
            markdown.push_str(&format!("## Page {}\n\n{}", start + offset + 1, text.trim()));
        }

        Ok(EngineOutput {
            markdown,
            images: Vec::new(),
            metadata: serde_json::json!({
                "engine": "native-lopdf",
                "page_count": page_count,
                "pages_analyzed": end.saturating_sub(start),
            }),
        })
    }
}
