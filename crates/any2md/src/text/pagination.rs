//! Splitting converted markdown into logical pages.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Page;

static PAGE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^#{1,2}\s*Page\s+(\d+)\s*$")
        .unwrap_or_else(|e| panic!("invalid page marker pattern: {e}"))
});

/// Split markdown on `# Page N` / `## Page N` markers (PDF output).
///
/// The declared page number is taken from the marker. Content before the
/// first marker is attached to the first page. A document with no markers
/// becomes a single page numbered 1.
pub fn split_on_page_markers(markdown: &str) -> Vec<Page> {
    let matches: Vec<_> = PAGE_MARKER_RE.captures_iter(markdown).collect();
    if matches.is_empty() {
        return vec![Page {
            page_number: 1,
            content: markdown.to_string(),
            sheet_name: None,
        }];
    }

    let mut pages = Vec::with_capacity(matches.len());
    for (i, caps) in matches.iter().enumerate() {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let number: usize = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(i + 1);

        let start = if i == 0 { 0 } else { whole.0 };
        let end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(markdown.len());

        pages.push(Page {
            page_number: number,
            content: markdown[start..end].trim_end().to_string(),
            sheet_name: None,
        });
    }
    pages
}

/// Byte offsets and declared numbers of page markers, in document order.
pub(crate) fn page_marker_positions(markdown: &str) -> Vec<(usize, usize)> {
    PAGE_MARKER_RE
        .captures_iter(markdown)
        .map(|caps| {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let number = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
            (start, number)
        })
        .collect()
}

/// Split markdown on top-level `# ` headings (Word output).
///
/// Page numbers are ordinal, 1-based. Preamble before the first heading
/// joins the first page. A document with no top-level heading is a single
/// page.
pub fn split_on_headings(markdown: &str) -> Vec<Page> {
    let mut heading_offsets = Vec::new();
    let mut offset = 0usize;
    for line in markdown.split_inclusive('\n') {
        if line.starts_with("# ") {
            heading_offsets.push(offset);
        }
        offset += line.len();
    }
    // a trailing line without a newline is covered by split_inclusive

    if heading_offsets.is_empty() {
        return vec![Page {
            page_number: 1,
            content: markdown.to_string(),
            sheet_name: None,
        }];
    }

    let mut pages = Vec::with_capacity(heading_offsets.len());
    for (i, &start_offset) in heading_offsets.iter().enumerate() {
        let start = if i == 0 { 0 } else { start_offset };
        let end = heading_offsets.get(i + 1).copied().unwrap_or(markdown.len());
        pages.push(Page {
            page_number: i + 1,
            content: markdown[start..end].trim_end().to_string(),
            sheet_name: None,
        });
    }
    pages
}
