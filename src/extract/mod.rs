//! Document pre-processing for agent attachments.
//!
//! The agent endpoint accepts arbitrary file attachments, but XML filings
//! frequently carry DOCTYPE declarations and namespace prefixes that choke
//! strict tooling downstream. [`text_path_for_analysis`] converts XML
//! documents to a plain-text sibling before they are attached; every other
//! file type passes through untouched.

mod xml;

pub use xml::{ExtractError, extract_xml_text, text_path_for_analysis};
