//! Multi-format text extraction for source documents.
//!
//! Extraction strategy is selected by filename extension
//! (case-insensitive) through the closed [`DocumentKind`] set. Every
//! extracted stream is normalized before it leaves this module, so
//! callers always see canonical text.

use std::io::Read;
use std::path::Path;

use crate::normalize::normalize;

/// Maximum decompressed bytes to read from a single ZIP entry
/// (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction strategy, classified from the filename extension.
///
/// `Unsupported` is a handled variant, not an error: unrecognized
/// inputs are decoded as lossy UTF-8, same as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
    Unsupported,
}

impl DocumentKind {
    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            Some("docx") => DocumentKind::Docx,
            Some("txt") => DocumentKind::Text,
            _ => DocumentKind::Unsupported,
        }
    }
}

/// Extraction failure for one document. Per-document: the ingestion
/// coordinator logs it and moves on, it never aborts a batch.
#[derive(Debug)]
pub enum ExtractError {
    Pdf { filename: String, reason: String },
    Docx { filename: String, reason: String },
}

impl ExtractError {
    pub fn filename(&self) -> &str {
        match self {
            ExtractError::Pdf { filename, .. } => filename,
            ExtractError::Docx { filename, .. } => filename,
        }
    }
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf { filename, reason } => {
                write!(f, "PDF extraction failed for {}: {}", filename, reason)
            }
            ExtractError::Docx { filename, reason } => {
                write!(f, "DOCX extraction failed for {}: {}", filename, reason)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract normalized text from raw document bytes.
pub fn extract_text(
    bytes: &[u8],
    filename: &str,
    kind: DocumentKind,
) -> Result<String, ExtractError> {
    let raw = match kind {
        DocumentKind::Pdf => extract_pdf(bytes, filename)?,
        DocumentKind::Docx => extract_docx(bytes, filename)?,
        // Plain text and anything unrecognized: decode as UTF-8,
        // dropping undecodable bytes.
        DocumentKind::Text | DocumentKind::Unsupported => decode_utf8_dropping(bytes),
    };
    Ok(normalize(&raw))
}

/// UTF-8 decode that drops undecodable byte sequences outright (no
/// U+FFFD replacement), so malformed inputs yield stable text and
/// therefore stable content ids.
fn decode_utf8_dropping(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

fn extract_pdf(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf {
        filename: filename.to_string(),
        reason: e.to_string(),
    })
}

/// Pull paragraph text out of `word/document.xml`: the text of each
/// `<w:t>` run, with a newline at every paragraph (`<w:p>`) end.
fn extract_docx(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    let docx_err = |reason: String| ExtractError::Docx {
        filename: filename.to_string(),
        reason,
    };

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| docx_err(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| docx_err("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| docx_err(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(docx_err("word/document.xml exceeds size limit".to_string()));
        }
    }

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(doc_xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text_run => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(docx_err(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
