//! PDF processor.
//!
//! Pipeline: stage bytes to a temp file for the engine, analyze structure,
//! pull embedded images, convert through the structure engine (falling back
//! to native per-page text on engine failure), filter headers/footers, embed
//! image links, paginate, format output.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::core::config::Config;
use crate::core::resolver::ResolvedOptions;
use crate::engine::{self, EngineRequest};
use crate::images::{ExtractedImage, embed_pdf_images, new_instance_id, pdf_image_filename, save_image};
use crate::output::apply_output_format;
use crate::processors::Processor;
use crate::text::headers::remove_headers_footers;
use crate::text::pagination::split_on_page_markers;
use crate::types::{Conversion, DocumentMetadata, SavedImage};
use crate::{Any2mdError, Result};

/// Images below this edge length are decoration (bullets, rules), skipped.
const MIN_IMAGE_DIMENSION: u32 = 50;

pub struct PdfProcessor;

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone)]
struct PdfAnalysis {
    page_count: usize,
    title: Option<String>,
    author: Option<String>,
}

#[async_trait]
impl Processor for PdfProcessor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    async fn convert(
        &self,
        content: &[u8],
        filename: &str,
        options: &ResolvedOptions,
        config: &Config,
    ) -> Result<Conversion> {
        let started = Instant::now();
        let bytes = Arc::new(content.to_vec());

        // The engine boundary takes a path, so stage the bytes on disk.
        // The temp file is removed on drop; saved images persist.
        let temp = tempfile::NamedTempFile::new().map_err(Any2mdError::Io)?;
        tokio::fs::write(temp.path(), content).await.map_err(Any2mdError::Io)?;

        let analysis = {
            let bytes = Arc::clone(&bytes);
            tokio::task::spawn_blocking(move || analyze(&bytes))
                .await
                .map_err(|e| Any2mdError::Internal(format!("analysis task failed: {}", e)))??
        };
        tracing::debug!(filename, pages = analysis.page_count, "Analyzed PDF structure");

        let extracted = if options.extract_images {
            let bytes = Arc::clone(&bytes);
            let start = options.start_page;
            let end = options.end_page;
            tokio::task::spawn_blocking(move || extract_images(&bytes, start, end))
                .await
                .map_err(|e| Any2mdError::Internal(format!("image task failed: {}", e)))?
        } else {
            Vec::new()
        };

        let request = EngineRequest {
            languages: options.languages.clone(),
            start_page: options.start_page,
            end_page: options.end_page,
            extract_images: options.extract_images,
        };
        let structure_engine = engine::engine().await?;
        let engine_name = structure_engine.name().to_string();
        let mut markdown = match structure_engine.analyze(temp.path(), &request).await {
            Ok(output) => output.markdown,
            Err(Any2mdError::Engine { message, .. }) => {
                tracing::warn!(filename, "Engine failed ({}), using native text fallback", message);
                let bytes = Arc::clone(&bytes);
                let start = options.start_page;
                let end = options.end_page;
                tokio::task::spawn_blocking(move || fallback_markdown(&bytes, start, end))
                    .await
                    .map_err(|e| Any2mdError::Internal(format!("fallback task failed: {}", e)))?
            }
            Err(other) => return Err(other),
        };

        if options.remove_header_footer {
            markdown = remove_headers_footers(&markdown, analysis.page_count, config.header_footer_min_pages);
        }

        let instance = new_instance_id();
        let mut saved = Vec::with_capacity(extracted.len());
        for img in &extracted {
            let page = img.page_number.unwrap_or(0);
            let name = pdf_image_filename(&instance, page, img.index);
            let path = save_image(&config.temp_image_dir, &name, &img.data)?;
            saved.push(SavedImage {
                filename: name,
                path,
                page_number: img.page_number,
                width: img.width,
                height: img.height,
            });
        }
        if !saved.is_empty() {
            markdown = embed_pdf_images(&markdown, &saved, config.static_base_url.as_deref());
        }

        let pages = if options.paginate {
            Some(split_on_page_markers(&markdown))
        } else {
            None
        };

        let metadata = DocumentMetadata {
            source_format: "pdf".to_string(),
            filename: filename.to_string(),
            page_count: Some(analysis.page_count),
            sheet_count: None,
            image_count: saved.len(),
            word_count: Conversion::word_count(&markdown),
            has_tables: Some(detect_tables(&markdown)),
            chart_count: None,
            title: analysis.title,
            author: analysis.author,
            created: None,
            modified: None,
            engine: Some(engine_name),
            processing_time_ms: started.elapsed().as_millis() as u64,
        };

        apply_output_format(
            Conversion {
                markdown,
                html: None,
                json: None,
                pages,
                images: saved,
                metadata,
            },
            options.output_format,
        )
    }
}

/// Load the document and read its page count and info dictionary.
fn analyze(bytes: &[u8]) -> Result<PdfAnalysis> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| Any2mdError::processing_with_source("failed to parse PDF", e))?;

    let page_count = doc.get_pages().len();
    let (title, author) = document_info(&doc);

    Ok(PdfAnalysis {
        page_count,
        title,
        author,
    })
}

/// A markdown table needs at least a header row and a delimiter row.
fn detect_tables(markdown: &str) -> bool {
    markdown
        .lines()
        .filter(|l| l.trim_start().starts_with('|'))
        .count()
        >= 2
}

/// Title and author from the trailer Info dictionary, when present.
fn document_info(doc: &Document) -> (Option<String>, Option<String>) {
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| o.as_dict().ok()),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        });

    let field = |dict: &Dictionary, key: &[u8]| -> Option<String> {
        dict.get(key)
            .ok()
            .and_then(|v| v.as_str().ok())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .filter(|s| !s.is_empty())
    };

    match info {
        Some(dict) => (field(dict, b"Title"), field(dict, b"Author")),
        None => (None, None),
    }
}

/// Native per-page text rendition, used when the engine fails.
///
/// Never fails: an unreadable document yields empty output, an unreadable
/// page yields an empty section.
fn fallback_markdown(bytes: &[u8], start_page: usize, end_page: Option<usize>) -> String {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("Fallback could not reload PDF: {}", e);
            return String::new();
        }
    };

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let end = end_page.unwrap_or(pages.len()).min(pages.len());
    let start = start_page.min(end);

    let mut markdown = String::new();
    for (offset, page_num) in pages[start..end].iter().enumerate() {
        let text = doc.extract_text(&[*page_num]).unwrap_or_default();
        if offset > 0 {
            markdown.push_str("\n\n");
        }
        markdown.push_str(&format!("## Page {}\n\n{}", start + offset + 1, text.trim()));
    }
    markdown
}

/// XObject image streams referenced by a page's resources.
fn page_image_streams(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut out = Vec::new();

    let Some(page_dict) = doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok()) else {
        return out;
    };
    let Some(resources) = resolve_dict(doc, page_dict.get(b"Resources").ok()) else {
        return out;
    };
    let Some(xobjects) = resolve_dict(doc, resources.get(b"XObject").ok()) else {
        return out;
    };

    for (_, value) in xobjects.iter() {
        if let Ok(id) = value.as_reference()
            && let Ok(Object::Stream(stream)) = doc.get_object(id)
            && stream
                .dict
                .get(b"Subtype")
                .ok()
                .and_then(|v| v.as_name().ok())
                .is_some_and(|n| n == b"Image")
        {
            out.push(id);
        }
    }
    out
}

fn resolve_dict<'a>(doc: &'a Document, value: Option<&'a Object>) -> Option<Dictionary> {
    match value? {
        Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| o.as_dict().ok()).cloned(),
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

/// Extract embedded images in the page range, re-encoded as PNG.
///
/// Best-effort: pages or images that cannot be decoded are skipped with a
/// debug log, never an error. Images under 50x50 are skipped as decoration.
fn extract_images(bytes: &[u8], start_page: usize, end_page: Option<usize>) -> Vec<ExtractedImage> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(_) => return Vec::new(),
    };

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    let end = end_page.unwrap_or(pages.len()).min(pages.len());
    let start = start_page.min(end);

    let mut out = Vec::new();
    for &(page_num, page_id) in &pages[start..end] {
        let mut index = 0usize;
        for stream_id in page_image_streams(&doc, page_id) {
            let Ok(Object::Stream(stream)) = doc.get_object(stream_id) else {
                continue;
            };
            match decode_image_stream(stream) {
                Some((png, width, height)) => {
                    out.push(ExtractedImage {
                        data: png,
                        page_number: Some(page_num as usize),
                        index,
                        width,
                        height,
                        original_name: None,
                    });
                    index += 1;
                }
                None => {
                    tracing::debug!(page = page_num, "Skipped undecodable or tiny image");
                }
            }
        }
    }
    out
}

/// Decode one image XObject to PNG bytes. Returns `None` for unsupported
/// encodings and sub-threshold dimensions.
fn decode_image_stream(stream: &lopdf::Stream) -> Option<(Vec<u8>, u32, u32)> {
    let width = stream.dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = stream.dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    if width < MIN_IMAGE_DIMENSION || height < MIN_IMAGE_DIMENSION {
        return None;
    }

    let filters = filter_names(&stream.dict);
    let rgb: image::RgbImage = if filters.iter().any(|f| f == b"DCTDecode") {
        // JPEG payload, hand it to the image crate as-is
        image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
            .ok()?
            .to_rgb8()
    } else {
        let data = stream.decompressed_content().ok()?;
        let components = colorspace_components(&stream.dict)?;
        raw_samples_to_rgb(&data, width, height, components)?
    };

    let mut png = Vec::new();
    {
        use image::ImageEncoder;
        let encoder = image::codecs::png::PngEncoder::new(&mut png);
        encoder
            .write_image(&rgb, width, height, image::ExtendedColorType::Rgb8)
            .ok()?;
    }
    Some((png, width, height))
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Sample component count for the declared colorspace. Only the device
/// colorspaces are handled; ICC and indexed spaces are skipped.
fn colorspace_components(dict: &Dictionary) -> Option<usize> {
    let name = dict.get(b"ColorSpace").ok()?.as_name().ok()?;
    match name {
        b"DeviceRGB" => Some(3),
        b"DeviceGray" => Some(1),
        b"DeviceCMYK" => Some(4),
        _ => None,
    }
}

/// Assemble raw 8-bit samples into an RGB image. CMYK converts channelwise;
/// gray replicates.
fn raw_samples_to_rgb(data: &[u8], width: u32, height: u32, components: usize) -> Option<image::RgbImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;
    if data.len() < pixels * components {
        return None;
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    match components {
        3 => rgb.extend_from_slice(&data[..pixels * 3]),
        1 => {
            for &g in &data[..pixels] {
                rgb.extend_from_slice(&[g, g, g]);
            }
        }
        4 => {
            for chunk in data[..pixels * 4].chunks_exact(4) {
                let (c, m, y, k) = (chunk[0] as u16, chunk[1] as u16, chunk[2] as u16, chunk[3] as u16);
                rgb.push((255 - (c + k).min(255)) as u8);
                rgb.push((255 - (m + k).min(255)) as u8);
                rgb.push((255 - (y + k).min(255)) as u8);
            }
        }
        _ => return None,
    }

    image::RgbImage::from_raw(width, height, rgb)
}
