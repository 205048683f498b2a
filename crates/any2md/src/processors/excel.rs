//! Excel (.xlsx/.xls) processor.
//!
//! Each sheet becomes a markdown section with a pipe table, capped at the
//! configured row limit. Sheets that fail to load are skipped with a warning
//! so one bad sheet never sinks the workbook. Media images under `xl/media/`
//! are saved and listed in a trailing `## Images` section, and chart parts
//! are counted into the metadata.

use async_trait::async_trait;
use calamine::{Data, Reader, Sheets, open_workbook_auto_from_rs};
use std::io::Cursor;
use std::time::Instant;

use crate::core::config::Config;
use crate::core::resolver::ResolvedOptions;
use crate::images::{embed_media_images, excel_image_filename, new_instance_id, save_image};
use crate::output::apply_output_format;
use crate::processors::Processor;
use crate::processors::office_meta::{core_properties, media_files};
use crate::types::{Conversion, DocumentMetadata, Page, SavedImage};
use crate::{Any2mdError, Result};

pub struct ExcelProcessor;

impl Default for ExcelProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcelProcessor {
    pub fn new() -> Self {
        Self
    }
}

/// One converted sheet, in workbook order.
struct SheetSection {
    name: String,
    markdown: String,
}

#[async_trait]
impl Processor for ExcelProcessor {
    fn name(&self) -> &str {
        "excel"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["xlsx", "xls"]
    }

    async fn convert(
        &self,
        content: &[u8],
        filename: &str,
        options: &ResolvedOptions,
        config: &Config,
    ) -> Result<Conversion> {
        let started = Instant::now();

        let bytes = content.to_vec();
        let wanted = options.sheet_names.clone();
        let include_formulas = options.include_formulas;
        let want_images = options.extract_images;
        let max_rows = config.excel_max_rows;
        let (sections, media, charts, props) = tokio::task::spawn_blocking(move || {
            let props = core_properties(&bytes);
            let media = if want_images {
                media_files(&bytes, "xl/media/")
            } else {
                Vec::new()
            };
            let charts = chart_count(&bytes);
            let sections = convert_workbook(bytes, &wanted, include_formulas, max_rows)?;
            Ok::<_, Any2mdError>((sections, media, charts, props))
        })
        .await
        .map_err(|e| Any2mdError::Internal(format!("workbook task failed: {}", e)))??;

        let sheet_count = sections.len();
        let mut markdown = sections
            .iter()
            .map(|s| s.markdown.as_str())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        let instance = new_instance_id();
        let mut saved = Vec::with_capacity(media.len());
        for (index, file) in media.iter().enumerate() {
            let name = excel_image_filename(&instance, index, &file.archive_name);
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
            Some(
                sections
                    .iter()
                    .enumerate()
                    .map(|(i, section)| Page {
                        page_number: i + 1,
                        content: section.markdown.clone(),
                        sheet_name: Some(section.name.clone()),
                    })
                    .collect(),
            )
        } else {
            None
        };

        let metadata = DocumentMetadata {
            source_format: "excel".to_string(),
            filename: filename.to_string(),
            page_count: None,
            sheet_count: Some(sheet_count),
            image_count: saved.len(),
            word_count: Conversion::word_count(&markdown),
            has_tables: None,
            chart_count: Some(charts),
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

/// Count chart parts (`xl/charts/chart*.xml`) in the package.
fn chart_count(package: &[u8]) -> usize {
    match zip::ZipArchive::new(Cursor::new(package)) {
        Ok(archive) => archive
            .file_names()
            .filter(|n| n.starts_with("xl/charts/chart") && n.ends_with(".xml"))
            .count(),
        Err(_) => 0,
    }
}

/// Convert the workbook's sheets. An empty `wanted` selects every sheet.
fn convert_workbook(
    bytes: Vec<u8>,
    wanted: &[String],
    include_formulas: bool,
    max_rows: usize,
) -> Result<Vec<SheetSection>> {
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| Any2mdError::processing_with_source("failed to open workbook", e))?;

    let all_names = workbook.sheet_names().to_vec();
    let selected: Vec<String> = if wanted.is_empty() {
        all_names
    } else {
        for name in wanted {
            if !all_names.iter().any(|n| n == name) {
                tracing::warn!(sheet = %name, "Requested sheet not found in workbook");
            }
        }
        all_names
            .iter()
            .filter(|n| wanted.iter().any(|w| w == *n))
            .cloned()
            .collect()
    };

    if selected.is_empty() {
        return Err(Any2mdError::processing(
            "workbook has no matching sheets to convert",
        ));
    }

    let mut sections = Vec::with_capacity(selected.len());
    for name in selected {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(sheet = %name, "Skipping unreadable sheet: {}", e);
                continue;
            }
        };

        let mut markdown = format!("## {}\n\n", name);
        markdown.push_str(&range_to_markdown(&range, max_rows));

        if include_formulas
            && let Ok(formulas) = workbook.worksheet_formula(&name)
        {
            let listing = formulas_to_markdown(&formulas);
            if !listing.is_empty() {
                markdown.push_str("\n\n**Formulas**\n\n");
                markdown.push_str(&listing);
            }
        }

        sections.push(SheetSection { name, markdown });
    }

    if sections.is_empty() {
        return Err(Any2mdError::processing(
            "every sheet in the workbook failed to load",
        ));
    }
    Ok(sections)
}

fn range_to_markdown(range: &calamine::Range<Data>, max_rows: usize) -> String {
    let (rows, cols) = range.get_size();
    if rows == 0 || cols == 0 {
        return "*This sheet is empty.*".to_string();
    }

    let mut out = String::new();
    let mut iter = range.rows();

    let header: Vec<String> = match iter.next() {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let value = format_cell(cell);
                if value.is_empty() {
                    format!("Column {}", i + 1)
                } else {
                    value
                }
            })
            .collect(),
        None => return "*This sheet is empty.*".to_string(),
    };

    out.push_str("| ");
    out.push_str(&header.join(" | "));
    out.push_str(" |\n|");
    for _ in 0..cols {
        out.push_str(" --- |");
    }
    out.push('\n');

    let data_rows = rows - 1;
    let shown = data_rows.min(max_rows);
    for cells in iter.take(shown) {
        out.push_str("| ");
        let row: Vec<String> = cells.iter().map(format_cell).collect();
        out.push_str(&row.join(" | "));
        out.push_str(" |\n");
    }

    if data_rows > shown {
        tracing::warn!(shown, total = data_rows, "Sheet truncated to row limit");
        out.push_str(&format!("\n*Showing first {} of {} rows.*\n", shown, data_rows));
    }
    out.push_str(&format!(
        "\n*Sheet contains {} rows and {} columns.*",
        data_rows, cols
    ));
    out
}

/// Format one cell, escaping table delimiters.
fn format_cell(cell: &Data) -> String {
    let raw = match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    };
    raw.replace('\\', "\\\\").replace('|', "\\|").replace('\n', " ")
}

/// List non-empty formulas as `cell: =formula` lines.
fn formulas_to_markdown(formulas: &calamine::Range<String>) -> String {
    let (start_row, start_col) = formulas.start().unwrap_or((0, 0));
    let mut lines = Vec::new();
    for (row, col, formula) in formulas.used_cells() {
        if formula.is_empty() {
            continue;
        }
        let cell = cell_reference(start_row + row as u32, start_col + col as u32);
        lines.push(format!("- `{}`: `={}`", cell, formula));
    }
    lines.join("\n")
}

/// 0-based (row, col) to A1 notation.
fn cell_reference(row: u32, col: u32) -> String {
    let mut letters = String::new();
    let mut n = col;
    loop {
        letters.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    format!("{}{}", letters, row + 1)
}
