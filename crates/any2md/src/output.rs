//! Final output formatting: markdown, HTML, or structured JSON.

use pulldown_cmark::{Options, Parser, html};

use crate::Result;
use crate::types::{Conversion, OutputFormat};

/// Render markdown to HTML with tables and strikethrough enabled.
///
/// A degenerate render (no output for non-empty input) falls back to the
/// escaped source wrapped in `<pre>`, so callers always get displayable HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);

    if out.trim().is_empty() && !markdown.trim().is_empty() {
        return format!("<pre>{}</pre>", escape_html(markdown));
    }
    out
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Fill the representation requested by `format` into the conversion.
///
/// The markdown content is always kept; `html` and `json` are additive views.
///
/// # Errors
///
/// Returns `Serialization` if the JSON view cannot be built.
pub fn apply_output_format(mut conversion: Conversion, format: OutputFormat) -> Result<Conversion> {
    match format {
        OutputFormat::Markdown => {}
        OutputFormat::Html => {
            conversion.html = Some(markdown_to_html(&conversion.markdown));
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "content": conversion.markdown,
                "pages": conversion.pages,
                "images": conversion.images,
                "metadata": conversion.metadata,
            });
            conversion.json = Some(value);
        }
    }
    Ok(conversion)
}
