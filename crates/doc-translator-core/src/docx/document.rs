//! Paragraph-level reading of WordprocessingML documents.
//!
//! Only the main document part (`word/document.xml`) is read. Each body-level
//! `w:p` element becomes one paragraph; its text is the concatenation of the
//! `w:t` runs inside it, with tabs and breaks turned into `\t` and `\n`.
//! Table cells and text boxes are skipped entirely, so their text neither
//! forms paragraphs nor leaks into the surrounding one.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use super::package::OoxmlPackage;
use crate::error::{Error, Result};

const DOCUMENT_PART: &str = "word/document.xml";

/// Containers whose paragraphs are not part of the body flow.
fn is_nested_container(name: &[u8]) -> bool {
    matches!(name, b"w:tbl" | b"w:txbxContent")
}

/// Counts used by the cost calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocStats {
    pub words: usize,
    pub characters: usize,
    pub paragraphs: usize,
    /// Approximated by the number of sections
    pub pages: usize,
}

/// Text content of a .docx file.
#[derive(Debug, Clone, Default)]
pub struct DocxDocument {
    paragraphs: Vec<String>,
    sections: usize,
}

impl DocxDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = OoxmlPackage::from_bytes(bytes)?;
        let xml = package
            .part(DOCUMENT_PART)
            .ok_or_else(|| Error::DocxRead(format!("missing {DOCUMENT_PART}")))?;
        Self::from_document_xml(xml)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Parse the XML of a `word/document.xml` part.
    pub fn from_document_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut paragraphs = Vec::new();
        // Open paragraphs, innermost last
        let mut open: Vec<String> = Vec::new();
        let mut in_text = false;
        // Tab stops inside paragraph properties are not content
        let mut in_props = false;
        let mut sections = 0;
        // Depth inside tables and text boxes
        let mut nested = 0usize;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::DocxRead(format!("malformed document.xml: {e}")))?;

            match event {
                Event::Eof => break,
                Event::Start(e) if is_nested_container(e.name().as_ref()) => nested += 1,
                Event::End(e) if is_nested_container(e.name().as_ref()) => {
                    nested = nested.saturating_sub(1);
                }
                Event::Start(_) | Event::Empty(_) | Event::End(_) | Event::Text(_) | Event::CData(_)
                    if nested > 0 => {}
                Event::Start(e) => match e.name().as_ref() {
                    b"w:p" => open.push(String::new()),
                    b"w:t" => in_text = true,
                    b"w:pPr" => in_props = true,
                    b"w:sectPr" => sections += 1,
                    name if !in_props => push_control(&mut open, name),
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"w:p" => paragraphs.push(String::new()),
                    b"w:sectPr" => sections += 1,
                    name if !in_props => push_control(&mut open, name),
                    _ => {}
                },
                Event::End(e) => match e.name().as_ref() {
                    b"w:p" => {
                        if let Some(text) = open.pop() {
                            paragraphs.push(text);
                        }
                    }
                    b"w:t" => in_text = false,
                    b"w:pPr" => in_props = false,
                    _ => {}
                },
                Event::Text(t) if in_text => {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::DocxRead(format!("bad text escape: {e}")))?;
                    if let Some(current) = open.last_mut() {
                        current.push_str(&text);
                    }
                }
                Event::CData(t) if in_text => {
                    if let Some(current) = open.last_mut() {
                        current.push_str(&String::from_utf8_lossy(&t.into_inner()));
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            paragraphs,
            sections: sections.max(1),
        })
    }

    /// Build a document directly from paragraph text.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paragraphs: paragraphs.into_iter().map(Into::into).collect(),
            sections: 1,
        }
    }

    /// All paragraphs, empty ones included.
    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    /// Paragraphs with visible text, in document order.
    pub fn non_empty_paragraphs(&self) -> Vec<&str> {
        self.paragraphs
            .iter()
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
            .collect()
    }

    pub const fn section_count(&self) -> usize {
        self.sections
    }

    /// Paragraph text joined with blank lines.
    pub fn text(&self) -> String {
        self.non_empty_paragraphs().join("\n\n")
    }

    pub fn stats(&self) -> DocStats {
        DocStats {
            words: self
                .paragraphs
                .iter()
                .map(|p| p.split_whitespace().count())
                .sum(),
            characters: self.paragraphs.iter().map(|p| p.chars().count()).sum(),
            paragraphs: self.paragraphs.len(),
            pages: self.sections,
        }
    }
}

fn push_control(open: &mut [String], name: &[u8]) {
    let Some(current) = open.last_mut() else {
        return;
    };
    match name {
        b"w:tab" | b"w:ptab" => current.push('\t'),
        b"w:br" | b"w:cr" => current.push('\n'),
        b"w:noBreakHyphen" => current.push('-'),
        _ => {}
    }
}
