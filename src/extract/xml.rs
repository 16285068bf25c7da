//! Best-effort XML to plain-text conversion.
//!
//! Converts a possibly malformed XML file into a readable text rendering
//! with a two-tier fallback: strict structural parse first, regex tag
//! stripping if the parse fails, and the original file path if anything
//! else goes wrong. The caller can always proceed with whatever path
//! comes back.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use thiserror::Error;

/// Processing instructions like `<?xml version="1.0"?>` or `<?I97 ?>`.
static PROCESSING_INSTRUCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\?.*?\?>").expect("valid regex"));

/// DOCTYPE declarations, which often reference external DTDs that cannot
/// be resolved offline.
static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!DOCTYPE.*?>").expect("valid regex"));

/// `xmlns` / `xmlns:prefix` attribute declarations. Removing them avoids
/// unbound-prefix failures; the namespace semantics are deliberately lost.
static XMLNS_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"xmlns(:\w+)?="[^"]+""#).expect("valid regex"));

/// Any remaining markup, for the fallback path.
static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Errors that can occur while extracting text from an XML document.
///
/// Parse failures are not represented here: a failed structural parse
/// degrades to tag stripping inside [`extract_xml_text`] rather than
/// surfacing as an error.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The text rendering could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Convert an XML file into a plain-text sibling (`<stem>.txt`).
///
/// The input is decoded leniently (invalid byte sequences are dropped),
/// cleaned of processing instructions, DOCTYPE declarations, and namespace
/// declarations, then parsed structurally. On a successful parse the output
/// is every non-empty trimmed text node in document order, joined with a
/// blank line. If the parse fails, all remaining markup is stripped instead
/// and the raw text kept as-is.
///
/// The output file is overwritten if it already exists. Returns the path
/// to the text file.
pub fn extract_xml_text(path: &Path) -> Result<PathBuf, ExtractError> {
    let bytes = fs::read(path).map_err(|source| ExtractError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = decode_lossy(&bytes);

    let cleaned = PROCESSING_INSTRUCTION.replace_all(&raw, "");
    let cleaned = DOCTYPE.replace_all(&cleaned, "");
    let cleaned = XMLNS_DECL.replace_all(&cleaned, "");

    let text = match collect_text_fragments(&cleaned) {
        Ok(fragments) => fragments.join("\n\n"),
        Err(err) => {
            tracing::warn!(
                name: "extract.xml.parse_failed",
                path = %path.display(),
                error = %err,
                "XML parse failed, falling back to tag stripping"
            );
            MARKUP.replace_all(&cleaned, "").into_owned()
        }
    };

    let txt_path = path.with_extension("txt");
    fs::write(&txt_path, &text).map_err(|source| ExtractError::Write {
        path: txt_path.clone(),
        source,
    })?;

    tracing::info!(
        name: "extract.xml.converted",
        from = %path.display(),
        to = %txt_path.display(),
        bytes = text.len(),
        "XML converted to text"
    );

    Ok(txt_path)
}

/// Resolve the path that should be attached to an agent call.
///
/// XML files are converted with [`extract_xml_text`]; any other extension
/// passes through unchanged. Extraction failures are logged and degrade to
/// the original path, so the caller never has to handle an error here —
/// a still-XML attachment is an acceptable degraded input for the model.
pub fn text_path_for_analysis(path: &Path) -> PathBuf {
    let is_xml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    if !is_xml {
        return path.to_path_buf();
    }

    match extract_xml_text(path) {
        Ok(txt_path) => txt_path,
        Err(err) => {
            tracing::warn!(
                name: "extract.xml.failed",
                path = %path.display(),
                error = %err,
                "XML conversion failed, attaching original file"
            );
            path.to_path_buf()
        }
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences.
///
/// Only the invalid bytes are skipped; a replacement character already
/// present in valid input passes through untouched.
fn decode_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                break;
            }
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                if let Ok(chunk) = std::str::from_utf8(valid) {
                    text.push_str(chunk);
                }
                match err.error_len() {
                    Some(len) => rest = &after[len..],
                    // Truncated sequence at end of input.
                    None => break,
                }
            }
        }
    }
    text
}

/// Strict structural pass: collect non-empty trimmed text nodes in
/// document order.
///
/// The reader itself tolerates some malformations, so element depth is
/// tracked explicitly and an unclosed element at EOF is treated as a parse
/// failure like any tag mismatch.
fn collect_text_fragments(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fragments = Vec::new();
    let mut depth = 0usize;

    let ill_formed = |message: &str| {
        quick_xml::Error::Io(std::sync::Arc::new(io::Error::new(
            io::ErrorKind::InvalidData,
            message.to_string(),
        )))
    };

    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ill_formed("unexpected closing tag"))?;
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    fragments.push(trimmed.to_string());
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    fragments.push(trimmed.to_string());
                }
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(quick_xml::Error::Io(std::sync::Arc::new(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "unclosed element at end of document",
                    ))));
                }
                break;
            }
            _ => {}
        }
    }

    Ok(fragments)
}
