//! Word (.docx) processor.
//!
//! The document body is streamed from `word/document.xml` in body order, so
//! paragraphs and tables come out interleaved exactly as authored. Styles map
//! to markdown headings, list items, quotes, and code blocks; runs carry
//! bold/italic/underline when formatting preservation is on, and tables become
//! pipe tables. Media files are saved and listed in a trailing `## Images`
//! section; Word has no page mapping for media.

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{Cursor, Read};
use std::time::Instant;

use crate::core::config::Config;
use crate::core::resolver::ResolvedOptions;
use crate::images::{embed_media_images, new_instance_id, save_image, word_image_filename};
use crate::output::apply_output_format;
use crate::processors::Processor;
use crate::processors::office_meta::{core_properties, media_files};
use crate::text::headers::remove_headers_footers;
use crate::text::pagination::split_on_headings;
use crate::types::{Conversion, DocumentMetadata, SavedImage};
use crate::{Any2mdError, Result};

pub struct WordProcessor;

impl Default for WordProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl WordProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Processor for WordProcessor {
    fn name(&self) -> &str {
        "word"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx", "doc"]
    }

    async fn convert(
        &self,
        content: &[u8],
        filename: &str,
        options: &ResolvedOptions,
        config: &Config,
    ) -> Result<Conversion> {
        let started = Instant::now();

        if filename.to_lowercase().ends_with(".doc") {
            return Err(Any2mdError::UnsupportedFormat(
                "doc (legacy binary Word; re-save as .docx)".to_string(),
            ));
        }

        let bytes = content.to_vec();
        let preserve = options.preserve_formatting;
        let want_images = options.extract_images;
        let (mut markdown, media, props) = tokio::task::spawn_blocking(move || {
            let markdown = parse_document(&bytes, preserve)?;
            let media = if want_images {
                media_files(&bytes, "word/media/")
            } else {
                Vec::new()
            };
            let props = core_properties(&bytes);
            Ok::<_, Any2mdError>((markdown, media, props))
        })
        .await
        .map_err(|e| Any2mdError::Internal(format!("parse task failed: {}", e)))??;

        // section count stands in for pages; Word has no fixed pagination
        let section_count = markdown.lines().filter(|l| l.starts_with("# ")).count().max(1);
        if options.remove_header_footer {
            markdown = remove_headers_footers(&markdown, section_count, config.header_footer_min_pages);
        }

        let instance = new_instance_id();
        let mut saved = Vec::with_capacity(media.len());
        for (index, file) in media.iter().enumerate() {
            let name = word_image_filename(&instance, index, &file.archive_name);
            let path = save_image(&config.temp_image_dir, &name, &file.data)?;
            saved.push(SavedImage {
                filename: name,
                path,
                page_number: None,
                width: file.width,
                height: file.height,
            });
        }
        if !saved.is_empty() {
            markdown = embed_media_images(&markdown, &saved, config.static_base_url.as_deref());
        }

        let pages = if options.paginate {
            Some(split_on_headings(&markdown))
        } else {
            None
        };

        let metadata = DocumentMetadata {
            source_format: "word".to_string(),
            filename: filename.to_string(),
            page_count: Some(section_count),
            sheet_count: None,
            image_count: saved.len(),
            word_count: Conversion::word_count(&markdown),
            has_tables: None,
            chart_count: None,
            title: props.title,
            author: props.author,
            created: props.created,
            modified: props.modified,
            engine: None,
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

/// Parse `word/document.xml` to markdown, body order preserved.
fn parse_document(package: &[u8], preserve_formatting: bool) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(package))
        .map_err(|e| Any2mdError::processing_with_source("not a valid .docx package", e))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Any2mdError::processing_with_source("package has no word/document.xml", e))?
        .read_to_string(&mut xml)
        .map_err(Any2mdError::Io)?;

    body_to_markdown(&xml, preserve_formatting)
}

#[derive(Default)]
struct BodyState {
    markdown: String,
    // paragraph
    para_text: String,
    para_style: Option<String>,
    // run
    run_text: String,
    run_bold: bool,
    run_italic: bool,
    run_underline: bool,
    in_run_props: bool,
    in_text: bool,
    // table
    table_depth: usize,
    table_rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
}

impl BodyState {
    fn flush_run(&mut self, preserve: bool) {
        if self.run_text.is_empty() {
            return;
        }
        let mut text = std::mem::take(&mut self.run_text);
        if preserve && !text.trim().is_empty() {
            if self.run_bold {
                text = format!("**{}**", text);
            }
            if self.run_italic {
                text = format!("*{}*", text);
            }
            if self.run_underline {
                text = format!("<u>{}</u>", text);
            }
        }
        self.para_text.push_str(&text);
    }

    fn flush_paragraph(&mut self) {
        let text = std::mem::take(&mut self.para_text);
        let style = self.para_style.take();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        match paragraph_kind(style.as_deref()) {
            ParaKind::Heading(level) => {
                self.markdown.push_str(&"#".repeat(level));
                self.markdown.push(' ');
                self.markdown.push_str(trimmed);
            }
            ParaKind::Bullet => {
                self.markdown.push_str("- ");
                self.markdown.push_str(trimmed);
            }
            ParaKind::Quote => {
                self.markdown.push_str("> ");
                self.markdown.push_str(trimmed);
            }
            ParaKind::Code => {
                self.markdown.push_str("```\n");
                self.markdown.push_str(trimmed);
                self.markdown.push_str("\n```");
            }
            ParaKind::Plain => self.markdown.push_str(trimmed),
        }
        self.markdown.push_str("\n\n");
    }

    fn flush_table(&mut self) {
        let rows = std::mem::take(&mut self.table_rows);
        if rows.is_empty() {
            return;
        }
        self.markdown.push_str(&render_pipe_table(&rows));
        self.markdown.push('\n');
    }
}

/// Markdown treatment of a paragraph, from its style name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParaKind {
    Heading(usize),
    Bullet,
    Quote,
    Code,
    Plain,
}

/// Style names match by substring: `Heading2`, `ListParagraph`, `IntenseQuote`
/// and friends all land in the right bucket.
fn paragraph_kind(style: Option<&str>) -> ParaKind {
    match style {
        Some("Title") => ParaKind::Heading(1),
        Some("Subtitle") => ParaKind::Heading(2),
        Some(s) if s.contains("Heading") => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            let level = digits.parse::<usize>().unwrap_or(1);
            ParaKind::Heading(level.clamp(1, 6))
        }
        Some(s) if s.contains("List") => ParaKind::Bullet,
        Some(s) if s.contains("Quote") => ParaKind::Quote,
        Some(s) if s.contains("Code") => ParaKind::Code,
        _ => ParaKind::Plain,
    }
}

fn attr_val(e: &BytesStart<'_>) -> Option<String> {
    e.try_get_attribute("w:val")
        .ok()
        .flatten()
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(attr_val(e).as_deref(), Some("false") | Some("0") | Some("none"))
}

fn body_to_markdown(xml: &str, preserve: bool) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = false;

    let mut state = BodyState::default();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let empty = matches!(event, Ok(Event::Empty(_)));
                match e.name().as_ref() {
                    b"w:tbl" => state.table_depth += 1,
                    b"w:tr" if state.table_depth == 1 => state.current_row.clear(),
                    b"w:tc" if state.table_depth == 1 => state.current_cell.clear(),
                    b"w:p" if state.table_depth == 0 => {
                        state.para_text.clear();
                        state.para_style = None;
                    }
                    b"w:p" if state.table_depth > 0 => {
                        if !state.current_cell.is_empty() {
                            state.current_cell.push(' ');
                        }
                    }
                    b"w:pStyle" if state.table_depth == 0 => state.para_style = attr_val(e),
                    b"w:r" => {
                        state.run_bold = false;
                        state.run_italic = false;
                        state.run_underline = false;
                    }
                    b"w:rPr" => state.in_run_props = true,
                    b"w:b" if state.in_run_props => state.run_bold = toggle_on(e),
                    b"w:i" if state.in_run_props => state.run_italic = toggle_on(e),
                    b"w:u" if state.in_run_props => state.run_underline = toggle_on(e),
                    b"w:t" if !empty => state.in_text = true,
                    b"w:br" | b"w:cr" => {
                        if state.table_depth == 0 {
                            state.run_text.push('\n');
                        } else {
                            state.current_cell.push(' ');
                        }
                    }
                    b"w:tab" => {
                        if state.table_depth == 0 {
                            state.run_text.push(' ');
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:tbl" => {
                    state.table_depth = state.table_depth.saturating_sub(1);
                    if state.table_depth == 0 {
                        state.flush_table();
                    }
                }
                b"w:tr" if state.table_depth == 1 => {
                    let row = std::mem::take(&mut state.current_row);
                    state.table_rows.push(row);
                }
                b"w:tc" if state.table_depth == 1 => {
                    let cell = std::mem::take(&mut state.current_cell);
                    state.current_row.push(escape_cell(cell.trim()));
                }
                b"w:t" => state.in_text = false,
                b"w:rPr" => state.in_run_props = false,
                b"w:r" => state.flush_run(preserve),
                b"w:p" if state.table_depth == 0 => state.flush_paragraph(),
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if state.in_text {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let text = quick_xml::escape::unescape(&text)
                        .map(|c| c.into_owned())
                        .unwrap_or(text);
                    if state.table_depth > 0 {
                        state.current_cell.push_str(&text);
                    } else {
                        state.run_text.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Any2mdError::processing(format!(
                    "document.xml parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(state.markdown.trim_end().to_string())
}

/// Render rows as a GitHub pipe table, first row as header, columns padded.
fn render_pipe_table(rows: &[Vec<String>]) -> String {
    let cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if cols == 0 {
        return String::new();
    }

    let mut widths = vec![3usize; cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let empty = String::new();
    let render_row = |row: &[String]| -> String {
        let mut line = String::from("|");
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).unwrap_or(&empty);
            let pad = width - cell.chars().count().min(*width);
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(pad));
            line.push_str(" |");
        }
        line.push('\n');
        line
    };

    let mut out = render_row(&rows[0]);
    out.push('|');
    for width in &widths {
        out.push(' ');
        out.push_str(&"-".repeat(*width));
        out.push_str(" |");
    }
    out.push('\n');
    for row in &rows[1..] {
        out.push_str(&render_row(row));
    }
    out
}

fn escape_cell(cell: &str) -> String {
    cell.replace('\\', "\\\\").replace('|', "\\|")
}
