//! Core data types shared across the conversion pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Any2mdError, Result};

/// Source document family, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Word,
    Excel,
}

impl SourceFormat {
    /// Resolve a format from a lowercased file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(SourceFormat::Pdf),
            "docx" | "doc" => Some(SourceFormat::Word),
            "xlsx" | "xls" => Some(SourceFormat::Excel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Pdf => "pdf",
            SourceFormat::Word => "word",
            SourceFormat::Excel => "excel",
        }
    }
}

/// Requested output representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Json,
}

impl OutputFormat {
    /// Parse a user-supplied format name.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for anything other than `markdown`, `html`, `json`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            other => Err(Any2mdError::validation(format!(
                "Unknown output format: {} (expected markdown, html, or json)",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
        }
    }
}

/// One logical page (or sheet) of converted output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Declared page number for PDFs, ordinal (1-based) for Word, sheet
    /// position for Excel.
    pub page_number: usize,
    /// Markdown content of the page.
    pub content: String,
    /// Sheet name, set only for spreadsheet sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
}

/// An image extracted from a document and written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedImage {
    /// Generated filename (instance-scoped, collision-free).
    pub filename: String,
    /// Absolute path of the written file.
    pub path: PathBuf,
    /// Source page number, when the format tracks one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
    pub width: u32,
    pub height: u32,
}

/// Metadata assembled for every conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_format: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_count: Option<usize>,
    pub image_count: usize,
    pub word_count: usize,
    /// Whether the converted content carries tables, PDF only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_tables: Option<bool>,
    /// Number of charts found in the workbook, Excel only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_count: Option<usize>,
    /// Document title from core properties, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// Name of the structure engine that produced the content, PDF only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    pub processing_time_ms: u64,
}

/// Result of converting a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversion {
    /// Full markdown content (always present, whatever the output format).
    pub markdown: String,
    /// Rendered HTML, present when `output_format = html`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Structured value, present when `output_format = json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    /// Page split, present when pagination was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Page>>,
    /// Images written to disk during conversion.
    pub images: Vec<SavedImage>,
    pub metadata: DocumentMetadata,
}

impl Conversion {
    /// Count whitespace-separated words in the markdown content.
    pub fn word_count(markdown: &str) -> usize {
        markdown.split_whitespace().count()
    }
}
