//! Multi-format text extraction for uploaded documents (PDF, DOCX, TXT).
//!
//! Dispatch is by lowercase filename extension through the closed
//! [`DocumentFormat`] enum. Page and paragraph boundaries are collapsed to
//! single spaces, so words can merge across a page break; that is a known
//! limitation of the whole-document extraction contract, not corrected here.

use std::io::Read;
use std::path::Path;

use crate::error::PipelineError;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// The closed set of supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    /// Resolve a lowercase filename extension to a format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" => Some(DocumentFormat::Txt),
            _ => None,
        }
    }
}

/// The lowercase extension of a filename: the segment after the last `.`,
/// or the whole name when there is no dot.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or(filename)
        .to_lowercase()
}

/// Extracts the full text of a stored document.
///
/// Returns [`PipelineError::UnsupportedFileType`] when the extension has no
/// extractor, and [`PipelineError::ExtractionFailed`] when the underlying
/// parser rejects the content.
pub fn extract_text(path: &Path) -> Result<String, PipelineError> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = file_extension(&filename);

    let format = DocumentFormat::from_extension(&extension)
        .ok_or(PipelineError::UnsupportedFileType { extension })?;

    let result = match format {
        DocumentFormat::Pdf => extract_pdf(path),
        DocumentFormat::Docx => extract_docx(path),
        DocumentFormat::Txt => extract_txt(path),
    };

    result.map_err(|message| PipelineError::ExtractionFailed { filename, message })
}

/// Per-page text, joined with single spaces. Page boundaries are lost.
fn extract_pdf(path: &Path) -> Result<String, String> {
    let document = lopdf::Document::load(path).map_err(|error| error.to_string())?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| error.to_string())?;
        pages.push(text.trim().to_string());
    }

    Ok(pages.join(" "))
}

/// Per-paragraph text from `word/document.xml`, joined with single spaces.
fn extract_docx(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|error| error.to_string())?;
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|error| error.to_string())?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|error| error.to_string())?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|error| error.to_string())?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err("word/document.xml exceeds size limit".to_string());
    }

    extract_paragraphs(&doc_xml)
}

/// Walk the WordprocessingML body: text runs (`w:t`) concatenate within a
/// paragraph (`w:p`); paragraphs join with single spaces.
fn extract_paragraphs(xml: &[u8]) -> Result<String, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        current.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" {
                    paragraphs.push(std::mem::take(&mut current));
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(error) => return Err(error.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join(" "))
}

/// Whole file, verbatim UTF-8.
fn extract_txt(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|error| error.to_string())
}
