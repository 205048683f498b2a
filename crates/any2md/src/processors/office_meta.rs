//! Core document properties from OOXML packages.
//!
//! Both `.docx` and `.xlsx` carry `docProps/core.xml` with Dublin Core
//! fields. Extraction is best-effort: a package without the part, or with
//! malformed XML, yields empty properties.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".bmp", ".tiff"];

/// A media image pulled from an OOXML package.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub archive_name: String,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Pull every image under `prefix` (`word/media/` or `xl/media/`), in name
/// order. Dimensions are best-effort; unreadable entries are skipped.
pub fn media_files(package: &[u8], prefix: &str) -> Vec<MediaFile> {
    let mut archive = match zip::ZipArchive::new(Cursor::new(package)) {
        Ok(archive) => archive,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| {
            let lower = n.to_lowercase();
            n.starts_with(prefix) && IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .map(|n| n.to_string())
        .collect();
    names.sort();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut data = Vec::new();
        match archive.by_name(&name) {
            Ok(mut file) => {
                if file.read_to_end(&mut data).is_err() {
                    continue;
                }
            }
            Err(_) => continue,
        }
        let (width, height) = image::load_from_memory(&data)
            .map(|img| (img.width(), img.height()))
            .unwrap_or((0, 0));
        out.push(MediaFile {
            archive_name: name,
            data,
            width,
            height,
        });
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Read core properties from OOXML package bytes.
pub fn core_properties(package: &[u8]) -> CoreProperties {
    let mut archive = match zip::ZipArchive::new(Cursor::new(package)) {
        Ok(archive) => archive,
        Err(_) => return CoreProperties::default(),
    };
    let mut xml = String::new();
    match archive.by_name("docProps/core.xml") {
        Ok(mut file) => {
            if file.read_to_string(&mut xml).is_err() {
                return CoreProperties::default();
            }
        }
        Err(_) => return CoreProperties::default(),
    }
    parse_core_xml(&xml)
}

fn parse_core_xml(xml: &str) -> CoreProperties {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut props = CoreProperties::default();
    let mut current: Option<&'static str> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = match e.name().as_ref() {
                    b"dc:title" => Some("title"),
                    b"dc:creator" => Some("author"),
                    b"dcterms:created" => Some("created"),
                    b"dcterms:modified" => Some("modified"),
                    _ => None,
                };
            }
            Ok(Event::Text(e)) => {
                if let Some(field) = current {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    if !text.is_empty() {
                        match field {
                            "title" => props.title = Some(text),
                            "author" => props.author = Some(text),
                            "created" => props.created = Some(text),
                            _ => props.modified = Some(text),
                        }
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("core.xml parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    props
}
