//! End-to-end conversion tests over the public API.

use std::sync::Arc;

use any2md::{
    Any2mdError, Config, DocumentRequest, RawOptions, batch_convert, convert_request,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

fn b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

fn request(content: String, filename: &str) -> DocumentRequest {
    DocumentRequest {
        file_content: content,
        filename: filename.to_string(),
        options: None,
    }
}

fn image_dir_config() -> Config {
    let dir = tempfile::tempdir().unwrap();
    Config {
        temp_image_dir: dir.keep(),
        ..Config::default()
    }
}

#[cfg(feature = "pdf")]
mod pdf_fixture {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, dictionary};

    /// Build a small PDF in memory, one page per text.
    pub fn generated_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(lopdf::Stream::new(
                dictionary! {},
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let kids_len = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => kids_len,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

#[cfg(any(feature = "word", feature = "excel"))]
mod ooxml_fixture {
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn write_package(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, body) in parts {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const CORE_XML: &str = r#"<?xml version="1.0"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
 xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
<dc:title>Fixture Document</dc:title><dc:creator>Test Author</dc:creator>
</cp:coreProperties>"#;

    #[cfg(feature = "word")]
    pub fn generated_docx(body: &str) -> Vec<u8> {
        let document = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        write_package(&[
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#.as_bytes(),
            ),
            ("word/document.xml", document.as_bytes()),
            ("docProps/core.xml", CORE_XML.as_bytes()),
        ])
    }

    #[cfg(feature = "excel")]
    const XLSX_CONTENT_TYPES: &str = r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    #[cfg(feature = "excel")]
    const XLSX_ROOT_RELS: &str = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    #[cfg(feature = "excel")]
    const XLSX_SHEET1: &str = r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>City</t></is></c><c r="B1" t="inlineStr"><is><t>Population</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Berlin</t></is></c><c r="B2"><v>3850000</v></c></row>
</sheetData></worksheet>"#;

    #[cfg(feature = "excel")]
    pub fn generated_xlsx() -> Vec<u8> {
        generated_xlsx_with_extras(&[])
    }

    /// Single-sheet workbook plus arbitrary extra package parts.
    #[cfg(feature = "excel")]
    pub fn generated_xlsx_with_extras(extras: &[(&str, &[u8])]) -> Vec<u8> {
        let mut parts: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", XLSX_CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", XLSX_ROOT_RELS.as_bytes()),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#.as_bytes(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#.as_bytes(),
            ),
            ("xl/worksheets/sheet1.xml", XLSX_SHEET1.as_bytes()),
            ("docProps/core.xml", CORE_XML.as_bytes()),
        ];
        parts.extend_from_slice(extras);
        write_package(&parts)
    }

    /// Workbook with two sheets, `Data` and `Notes`.
    #[cfg(feature = "excel")]
    pub fn generated_xlsx_two_sheets() -> Vec<u8> {
        write_package(&[
            ("[Content_Types].xml", XLSX_CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", XLSX_ROOT_RELS.as_bytes()),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Data" sheetId="1" r:id="rId1"/><sheet name="Notes" sheetId="2" r:id="rId2"/></sheets></workbook>"#.as_bytes(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#.as_bytes(),
            ),
            ("xl/worksheets/sheet1.xml", XLSX_SHEET1.as_bytes()),
            (
                "xl/worksheets/sheet2.xml",
                r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Remark</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Check totals</t></is></c></row>
</sheetData></worksheet>"#.as_bytes(),
            ),
            ("docProps/core.xml", CORE_XML.as_bytes()),
        ])
    }
}

#[cfg(feature = "pdf")]
mod pdf_pipeline {
    use super::*;
    use any2md::{EngineOutput, EngineRequest, StructureEngine, clear_engine, set_engine};
    use async_trait::async_trait;
    use pdf_fixture::generated_pdf;
    use serial_test::serial;
    use std::path::Path;

    #[tokio::test]
    #[serial]
    async fn test_pdf_base64_end_to_end() {
        clear_engine();
        let bytes = generated_pdf(&["Hello from page one", "And page two here"]);
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "report.pdf"), None, &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("Hello from page one"));
        let pages = conversion.pages.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(conversion.metadata.page_count, Some(2));
        assert_eq!(conversion.metadata.source_format, "pdf");
        clear_engine();
    }

    #[tokio::test]
    #[serial]
    async fn test_pdf_file_reference_end_to_end() {
        clear_engine();
        let bytes = generated_pdf(&["File reference content"]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.pdf");
        std::fs::write(&path, &bytes).unwrap();

        let config = image_dir_config();
        let content = format!("file://{}", path.display());
        let conversion = convert_request(&request(content, "input.pdf"), None, &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("File reference content"));
        clear_engine();
    }

    struct CannedEngine;

    #[async_trait]
    impl StructureEngine for CannedEngine {
        async fn analyze(
            &self,
            _path: &Path,
            _request: &EngineRequest,
        ) -> any2md::Result<EngineOutput> {
            Ok(EngineOutput {
                markdown: "## Page 1\n\ncanned engine text".to_string(),
                ..EngineOutput::default()
            })
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl StructureEngine for FailingEngine {
        async fn analyze(
            &self,
            _path: &Path,
            _request: &EngineRequest,
        ) -> any2md::Result<EngineOutput> {
            Err(Any2mdError::engine("model unavailable"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_installed_engine_drives_conversion() {
        set_engine(Arc::new(CannedEngine));
        let bytes = generated_pdf(&["native text"]);
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "doc.pdf"), None, &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("canned engine text"));
        assert_eq!(conversion.metadata.engine.as_deref(), Some("canned"));
        clear_engine();
    }

    struct TableEngine;

    #[async_trait]
    impl StructureEngine for TableEngine {
        async fn analyze(
            &self,
            _path: &Path,
            _request: &EngineRequest,
        ) -> any2md::Result<EngineOutput> {
            Ok(EngineOutput {
                markdown: "## Page 1\n\n| Item | Qty |\n| --- | --- |\n| bolt | 4 |".to_string(),
                ..EngineOutput::default()
            })
        }

        fn name(&self) -> &str {
            "tabular"
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_table_content_flagged_in_metadata() {
        set_engine(Arc::new(TableEngine));
        let bytes = generated_pdf(&["ignored"]);
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "inv.pdf"), None, &config)
            .await
            .unwrap();
        assert_eq!(conversion.metadata.has_tables, Some(true));
        clear_engine();

        set_engine(Arc::new(CannedEngine));
        let conversion = convert_request(&request(b64(&bytes), "inv.pdf"), None, &config)
            .await
            .unwrap();
        assert_eq!(conversion.metadata.has_tables, Some(false));
        clear_engine();
    }

    #[tokio::test]
    #[serial]
    async fn test_engine_failure_falls_back_to_native_text() {
        set_engine(Arc::new(FailingEngine));
        let bytes = generated_pdf(&["survives the engine outage"]);
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "doc.pdf"), None, &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("survives the engine outage"));
        clear_engine();
    }
}

#[cfg(feature = "word")]
mod word_pipeline {
    use super::*;
    use ooxml_fixture::generated_docx;

    #[tokio::test]
    async fn test_docx_end_to_end() {
        let body = r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Overview</w:t></w:r></w:p>
<w:p><w:r><w:t>Some body text.</w:t></w:r></w:p>"#;
        let bytes = generated_docx(body);
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "notes.docx"), None, &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("# Overview"));
        assert!(conversion.markdown.contains("Some body text."));
        assert_eq!(conversion.metadata.source_format, "word");
        assert_eq!(conversion.metadata.title.as_deref(), Some("Fixture Document"));
        assert_eq!(conversion.metadata.author.as_deref(), Some("Test Author"));
    }

    #[tokio::test]
    async fn test_docx_list_quote_code_and_underline() {
        let body = r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/></w:pPr><w:r><w:t>item one</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:t>quoted line</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Code"/></w:pPr><w:r><w:t>fn main() {}</w:t></w:r></w:p>
<w:p><w:r><w:rPr><w:u w:val="single"/></w:rPr><w:t>important</w:t></w:r></w:p>"#;
        let bytes = generated_docx(body);
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "styles.docx"), None, &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("- item one"));
        assert!(conversion.markdown.contains("> quoted line"));
        assert!(conversion.markdown.contains("```\nfn main() {}\n```"));
        assert!(conversion.markdown.contains("<u>important</u>"));
    }

    #[tokio::test]
    async fn test_metadata_only_conversion() {
        let bytes = generated_docx(r#"<w:p><w:r><w:t>hidden body</w:t></w:r></w:p>"#);
        let config = image_dir_config();
        let options = RawOptions {
            include_content: Some(false),
            ..RawOptions::default()
        };

        let conversion = convert_request(&request(b64(&bytes), "n.docx"), Some(&options), &config)
            .await
            .unwrap();

        assert!(conversion.markdown.is_empty());
        assert!(conversion.html.is_none());
        assert!(conversion.pages.is_none());
        // metadata is computed before the content is dropped
        assert_eq!(conversion.metadata.word_count, 2);
        assert_eq!(conversion.metadata.title.as_deref(), Some("Fixture Document"));
    }

    #[tokio::test]
    async fn test_legacy_doc_rejected() {
        let config = image_dir_config();
        let error = convert_request(&request(b64(b"\xd0\xcf\x11\xe0junk"), "old.doc"), None, &config)
            .await
            .unwrap_err();
        assert!(matches!(error, Any2mdError::UnsupportedFormat(_)));
        assert_eq!(error.error_code().status_code(), 400);
    }

    #[tokio::test]
    async fn test_html_output_format() {
        let bytes = generated_docx(r#"<w:p><w:r><w:t>plain paragraph</w:t></w:r></w:p>"#);
        let config = image_dir_config();
        let options = RawOptions {
            output_format: Some("html".to_string()),
            ..RawOptions::default()
        };

        let conversion = convert_request(&request(b64(&bytes), "n.docx"), Some(&options), &config)
            .await
            .unwrap();

        let html = conversion.html.unwrap();
        assert!(html.contains("plain paragraph"));
    }
}

#[cfg(feature = "excel")]
mod excel_pipeline {
    use super::*;
    use ooxml_fixture::{generated_xlsx, generated_xlsx_two_sheets, generated_xlsx_with_extras};

    #[tokio::test]
    async fn test_xlsx_end_to_end() {
        let bytes = generated_xlsx();
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "cities.xlsx"), None, &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("## Data"));
        assert!(conversion.markdown.contains("| City | Population |"));
        assert!(conversion.markdown.contains("Berlin"));
        assert_eq!(conversion.metadata.sheet_count, Some(1));
    }

    #[tokio::test]
    async fn test_xlsx_paginated_sheets_carry_names() {
        let bytes = generated_xlsx();
        let config = image_dir_config();
        let options = RawOptions {
            paginate: Some(true),
            ..RawOptions::default()
        };

        let conversion = convert_request(&request(b64(&bytes), "cities.xlsx"), Some(&options), &config)
            .await
            .unwrap();

        let pages = conversion.pages.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].sheet_name.as_deref(), Some("Data"));
    }

    #[tokio::test]
    async fn test_sheet_names_select_subset() {
        let bytes = generated_xlsx_two_sheets();
        let config = image_dir_config();
        let options = RawOptions {
            sheet_names: Some(vec!["Notes".to_string()]),
            ..RawOptions::default()
        };

        let conversion = convert_request(&request(b64(&bytes), "book.xlsx"), Some(&options), &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("## Notes"));
        assert!(conversion.markdown.contains("Check totals"));
        assert!(!conversion.markdown.contains("## Data"));
        assert_eq!(conversion.metadata.sheet_count, Some(1));
    }

    #[tokio::test]
    async fn test_all_sheets_convert_by_default() {
        let bytes = generated_xlsx_two_sheets();
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "book.xlsx"), None, &config)
            .await
            .unwrap();

        assert!(conversion.markdown.contains("## Data"));
        assert!(conversion.markdown.contains("## Notes"));
        assert_eq!(conversion.metadata.sheet_count, Some(2));
    }

    #[tokio::test]
    async fn test_workbook_media_images_extracted() {
        let bytes =
            generated_xlsx_with_extras(&[("xl/media/image1.png", b"\x89PNG not a real png".as_slice())]);
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "charts.xlsx"), None, &config)
            .await
            .unwrap();

        assert_eq!(conversion.metadata.image_count, 1);
        assert_eq!(conversion.images.len(), 1);
        assert!(conversion.images[0].filename.starts_with("excel_"));
        assert!(conversion.images[0].filename.ends_with("_image1.png"));
        assert!(conversion.images[0].path.exists());
        assert!(conversion.markdown.contains("## Images"));
    }

    #[tokio::test]
    async fn test_chart_parts_counted() {
        let bytes = generated_xlsx_with_extras(&[
            ("xl/charts/chart1.xml", b"<c:chartSpace/>".as_slice()),
            ("xl/charts/chart2.xml", b"<c:chartSpace/>".as_slice()),
        ]);
        let config = image_dir_config();

        let conversion = convert_request(&request(b64(&bytes), "charts.xlsx"), None, &config)
            .await
            .unwrap();

        assert_eq!(conversion.metadata.chart_count, Some(2));
    }
}

#[tokio::test]
async fn test_unsupported_extension_rejected() {
    let config = Config::default();
    let error = convert_request(&request(b64(b"hello"), "notes.txt"), None, &config)
        .await
        .unwrap_err();
    assert_eq!(error.error_code().status_code(), 400);
}

#[tokio::test]
async fn test_oversized_input_rejected() {
    let config = Config {
        max_file_size: 16,
        ..Config::default()
    };
    let error = convert_request(&request(b64(&vec![0u8; 64]), "big.pdf"), None, &config)
        .await
        .unwrap_err();
    assert!(matches!(error, Any2mdError::FileTooLarge(_)));
    assert_eq!(error.error_code().status_code(), 413);
}

#[tokio::test]
async fn test_missing_file_reference_rejected() {
    let config = Config::default();
    let error = convert_request(
        &request("file:///nonexistent/input.pdf".to_string(), "input.pdf"),
        None,
        &config,
    )
    .await
    .unwrap_err();
    assert!(matches!(error, Any2mdError::Validation { .. }));
}

#[cfg(feature = "word")]
#[tokio::test]
async fn test_batch_preserves_order_and_isolates_failures() {
    use ooxml_fixture::generated_docx;

    let good = generated_docx(r#"<w:p><w:r><w:t>fine</w:t></w:r></w:p>"#);
    let documents = vec![
        request(b64(&good), "a.docx"),
        request(b64(b"not xml"), "b.png"),
        request(b64(b"corrupt zip"), "c.docx"),
    ];
    let config = Arc::new(image_dir_config());

    let outcome = batch_convert(documents, None, config).await;

    assert_eq!(outcome.items.len(), 3);
    assert_eq!(outcome.summary.total, 3);
    assert_eq!(outcome.summary.successful, 1);
    assert_eq!(outcome.summary.failed, 2);
    for (i, item) in outcome.items.iter().enumerate() {
        assert_eq!(item.index, i);
    }
    assert!(outcome.items[0].outcome.is_ok());
    assert!(outcome.items[1].outcome.is_err());
    assert!(outcome.items[2].outcome.is_err());
}
