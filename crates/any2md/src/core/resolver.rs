//! Option resolution for the unified convert entry point.
//!
//! Callers supply optional per-file options and optional global options.
//! Resolution is a three-layer merge, most specific wins:
//!
//! 1. per-file options (any field explicitly set)
//! 2. global options
//! 3. per-format defaults, then universal defaults

use serde::{Deserialize, Serialize};

use crate::types::{OutputFormat, SourceFormat};
use crate::{Any2mdError, Result};

/// Caller-facing options. Every field is optional; unset fields inherit from
/// the global options and then from the per-format defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    /// Output representation: `markdown`, `html`, or `json`.
    pub output_format: Option<String>,
    /// Include the converted content in the result; `false` keeps only
    /// metadata and images.
    pub include_content: Option<bool>,
    pub extract_images: Option<bool>,
    pub remove_header_footer: Option<bool>,
    pub paginate: Option<bool>,
    /// First page to convert, 0-based (PDF).
    pub start_page: Option<usize>,
    /// Exclusive end page (PDF). `None` converts to the end.
    pub end_page: Option<usize>,
    /// Language hints for the structure engine (PDF).
    pub languages: Option<Vec<String>>,
    /// Apply bold/italic run formatting (Word).
    pub preserve_formatting: Option<bool>,
    /// Emit a formulas section per sheet (Excel).
    pub include_formulas: Option<bool>,
    /// Restrict conversion to the named sheets (Excel); empty = all.
    pub sheet_names: Option<Vec<String>>,
}

impl RawOptions {
    /// Overlay `self` on top of `base`: fields set on `self` win.
    pub fn merged_over(&self, base: &RawOptions) -> RawOptions {
        RawOptions {
            output_format: self.output_format.clone().or_else(|| base.output_format.clone()),
            include_content: self.include_content.or(base.include_content),
            extract_images: self.extract_images.or(base.extract_images),
            remove_header_footer: self.remove_header_footer.or(base.remove_header_footer),
            paginate: self.paginate.or(base.paginate),
            start_page: self.start_page.or(base.start_page),
            end_page: self.end_page.or(base.end_page),
            languages: self.languages.clone().or_else(|| base.languages.clone()),
            preserve_formatting: self.preserve_formatting.or(base.preserve_formatting),
            include_formulas: self.include_formulas.or(base.include_formulas),
            sheet_names: self.sheet_names.clone().or_else(|| base.sheet_names.clone()),
        }
    }
}

/// Fully resolved options, no defaults left implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    pub output_format: OutputFormat,
    pub include_content: bool,
    pub extract_images: bool,
    pub remove_header_footer: bool,
    pub paginate: bool,
    pub start_page: usize,
    pub end_page: Option<usize>,
    pub languages: Vec<String>,
    pub preserve_formatting: bool,
    pub include_formulas: bool,
    pub sheet_names: Vec<String>,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Markdown,
            include_content: true,
            extract_images: true,
            remove_header_footer: true,
            paginate: false,
            start_page: 0,
            end_page: None,
            languages: Vec::new(),
            preserve_formatting: false,
            include_formulas: false,
            sheet_names: Vec::new(),
        }
    }
}

/// Merge per-file options over global options, then fill per-format defaults.
///
/// Per-format defaults:
/// - PDF: `paginate = true`, `start_page = 0`, `languages = ["auto"]`
/// - Word: `preserve_formatting = true`
/// - Excel: `include_formulas = true`
///
/// Universal defaults: `output_format = markdown`, `include_content = true`,
/// `extract_images = true`, `remove_header_footer = true`, `paginate = false`.
///
/// # Errors
///
/// Returns `Validation` for invalid range (`end_page <= start_page`) or an
/// unknown output format name.
pub fn resolve_options(
    file_options: Option<&RawOptions>,
    global_options: Option<&RawOptions>,
    format: SourceFormat,
) -> Result<ResolvedOptions> {
    let empty = RawOptions::default();
    let global = global_options.unwrap_or(&empty);
    let merged = file_options.unwrap_or(&empty).merged_over(global);

    let output_format = match &merged.output_format {
        Some(name) => OutputFormat::parse(name)?,
        None => OutputFormat::Markdown,
    };

    let resolved = ResolvedOptions {
        output_format,
        include_content: merged.include_content.unwrap_or(true),
        extract_images: merged.extract_images.unwrap_or(true),
        remove_header_footer: merged.remove_header_footer.unwrap_or(true),
        paginate: merged.paginate.unwrap_or(format == SourceFormat::Pdf),
        start_page: merged.start_page.unwrap_or(0),
        end_page: merged.end_page,
        languages: match merged.languages {
            Some(langs) if !langs.is_empty() => langs,
            _ if format == SourceFormat::Pdf => vec!["auto".to_string()],
            _ => Vec::new(),
        },
        preserve_formatting: merged.preserve_formatting.unwrap_or(format == SourceFormat::Word),
        include_formulas: merged.include_formulas.unwrap_or(format == SourceFormat::Excel),
        sheet_names: merged.sheet_names.unwrap_or_default(),
    };

    if let Some(end) = resolved.end_page
        && end <= resolved.start_page
    {
        return Err(Any2mdError::validation(format!(
            "end_page ({}) must be greater than start_page ({})",
            end, resolved.start_page
        )));
    }

    Ok(resolved)
}
