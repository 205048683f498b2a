//! Header and footer removal.
//!
//! Two complementary passes:
//!
//! 1. **Pattern pass** - drops lines matching well-known header/footer shapes
//!    (bare page numbers, `Page N of M`, `N / M`, ISO dates, copyright
//!    notices) regardless of document length.
//! 2. **Repetition pass** - drops short lines that recur on enough pages to
//!    be running headers or footers. The threshold scales with the true page
//!    count: `max(2, page_count / 3)`. Skipped entirely for documents below
//!    the configured minimum page count.
//!
//! Markdown structure is never touched: heading lines and table rows are
//! exempt from both passes, and leftover blank runs collapse to one line.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Lines at or above this length are content, never headers or footers.
const MAX_CANDIDATE_LEN: usize = 100;

static HEADER_FOOTER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d+$",
        r"(?i)^page\s+\d+(\s+of\s+\d+)?$",
        r"^\d+\s*/\s*\d+$",
        r"^\d{4}-\d{2}-\d{2}$",
        r"(?i)^copyright\b.*$",
        r"^©\s*\d{4}.*$",
        // CJK page markers and dates seen in bilingual documents
        r"^第\s*\d+\s*页(\s*共\s*\d+\s*页)?$",
        r"^\d{4}年\d{1,2}月\d{1,2}日$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid header pattern {p}: {e}")))
    .collect()
});

/// Repetition threshold for a document with `page_count` pages.
pub fn repetition_threshold(page_count: usize) -> usize {
    (page_count / 3).max(2)
}

fn is_exempt(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with('|')
}

fn matches_pattern(trimmed: &str) -> bool {
    HEADER_FOOTER_PATTERNS.iter().any(|re| re.is_match(trimmed))
}

/// Remove header and footer lines from markdown content.
///
/// `page_count` drives the repetition threshold; the repetition pass is
/// skipped when `page_count < min_pages`.
pub fn remove_headers_footers(content: &str, page_count: usize, min_pages: usize) -> String {
    // Census for the repetition pass: trimmed short lines, structure exempt.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    if page_count >= min_pages {
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.len() >= MAX_CANDIDATE_LEN || is_exempt(trimmed) {
                continue;
            }
            *counts.entry(trimmed).or_insert(0) += 1;
        }
    }
    let threshold = repetition_threshold(page_count);

    let mut kept: Vec<&str> = Vec::new();
    let mut removed = 0usize;
    for line in content.lines() {
        let trimmed = line.trim();

        if !trimmed.is_empty() && trimmed.len() < MAX_CANDIDATE_LEN && !is_exempt(trimmed) {
            if matches_pattern(trimmed) {
                removed += 1;
                continue;
            }
            if page_count >= min_pages
                && counts.get(trimmed).copied().unwrap_or(0) >= threshold
            {
                removed += 1;
                continue;
            }
        }

        kept.push(line);
    }

    if removed > 0 {
        tracing::debug!(removed, page_count, threshold, "Removed header/footer lines");
    }

    collapse_blank_runs(&kept)
}

/// Join lines, collapsing consecutive blank lines into one.
fn collapse_blank_runs(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut last_blank = false;
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && last_blank {
            continue;
        }
        out.push_str(line);
        out.push('\n');
        last_blank = blank;
    }
    if !out.is_empty() {
        out.pop();
    }
    out
}
