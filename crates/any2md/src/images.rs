//! Saving extracted images and embedding links into markdown.
//!
//! Every conversion gets a short instance id so parallel conversions of the
//! same document never collide on disk. Filenames are deterministic within an
//! instance:
//!
//! - PDF: `pdf_{instance}_page_{page}_img_{index}.png`
//! - Word: `word_{instance}_img_{index}_{original_name}`
//! - Excel: `excel_{instance}_img_{index}_{original_name}`

use std::path::{Path, PathBuf};

use crate::text::pagination::page_marker_positions;
use crate::types::SavedImage;
use crate::{Any2mdError, Result};

/// An image pulled out of a document, not yet written to disk.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// Encoded image bytes (PNG for PDF sources, original container for Word).
    pub data: Vec<u8>,
    /// Source page, when the format tracks one.
    pub page_number: Option<usize>,
    /// Per-page index (PDF) or document-wide index (Word).
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Original archive filename (Word media only).
    pub original_name: Option<String>,
}

/// Fresh conversion instance id: first 8 hex chars of a v4 UUID.
pub fn new_instance_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Filename for a PDF page image.
pub fn pdf_image_filename(instance: &str, page: usize, index: usize) -> String {
    format!("pdf_{}_page_{}_img_{}.png", instance, page, index)
}

/// Filename for a Word media image, keeping the original basename.
pub fn word_image_filename(instance: &str, index: usize, original_name: &str) -> String {
    let base = original_name.rsplit('/').next().unwrap_or(original_name);
    format!("word_{}_img_{}_{}", instance, index, base)
}

/// Filename for an Excel media image, keeping the original basename.
pub fn excel_image_filename(instance: &str, index: usize, original_name: &str) -> String {
    let base = original_name.rsplit('/').next().unwrap_or(original_name);
    format!("excel_{}_img_{}_{}", instance, index, base)
}

/// Write an image file under `dir`, creating the directory on demand.
///
/// # Errors
///
/// Returns `Io` for filesystem errors.
pub fn save_image(dir: &Path, filename: &str, data: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(Any2mdError::Io)?;
    let path = dir.join(filename);
    std::fs::write(&path, data).map_err(Any2mdError::Io)?;
    tracing::debug!(path = %path.display(), size = data.len(), "Saved image");
    Ok(path)
}

fn image_url(base_url: Option<&str>, filename: &str) -> String {
    match base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), filename),
        None => filename.to_string(),
    }
}

/// Append per-page image sections to PDF markdown.
///
/// After each page's content (bounded by the next page marker) a
/// `### Images from Page N` section lists that page's images. Images whose
/// page has no marker in the content are listed at the end of the document.
pub fn embed_pdf_images(markdown: &str, images: &[SavedImage], base_url: Option<&str>) -> String {
    if images.is_empty() {
        return markdown.to_string();
    }

    let markers = page_marker_positions(markdown);

    // page number -> insertion offset (start of the *next* marker, or EOF)
    let mut insert_at: Vec<(usize, usize)> = Vec::with_capacity(markers.len());
    for (i, &(_, number)) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map(|&(start, _)| start).unwrap_or(markdown.len());
        insert_at.push((number, end));
    }

    let mut sections: Vec<(usize, String)> = Vec::new();
    let mut trailing = String::new();

    let mut pages: Vec<usize> = images.iter().filter_map(|img| img.page_number).collect();
    pages.sort_unstable();
    pages.dedup();

    for page in pages {
        let mut section = format!("\n\n### Images from Page {}\n", page);
        for img in images.iter().filter(|img| img.page_number == Some(page)) {
            section.push_str(&format!(
                "\n![{}]({})",
                img.filename,
                image_url(base_url, &img.filename)
            ));
        }
        match insert_at.iter().find(|&&(number, _)| number == page) {
            Some(&(_, offset)) => sections.push((offset, section)),
            None => trailing.push_str(&section),
        }
    }

    // insert back-to-front so earlier offsets stay valid
    sections.sort_by_key(|&(offset, _)| offset);
    let mut result = markdown.to_string();
    for (offset, section) in sections.into_iter().rev() {
        result.insert_str(offset, &section);
    }
    result.push_str(&trailing);
    result
}

/// Append a trailing `## Images` section listing OOXML media images.
pub fn embed_media_images(markdown: &str, images: &[SavedImage], base_url: Option<&str>) -> String {
    if images.is_empty() {
        return markdown.to_string();
    }
    let mut result = markdown.trim_end().to_string();
    result.push_str("\n\n## Images\n");
    for img in images {
        result.push_str(&format!(
            "\n![{}]({})",
            img.filename,
            image_url(base_url, &img.filename)
        ));
    }
    result
}
