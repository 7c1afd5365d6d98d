use std::fmt::Write;

use quick_xml::escape::escape;

use super::package::OoxmlPackage;
use crate::error::Result;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

/// Builds a minimal .docx with one paragraph per entry.
#[derive(Debug, Default)]
pub struct DocxWriter {
    paragraphs: Vec<String>,
}

impl DocxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.paragraphs.push(text.into());
        self
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    fn document_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
        );

        for paragraph in &self.paragraphs {
            xml.push_str("<w:p><w:r>");
            for (i, line) in paragraph.split('\n').enumerate() {
                if i > 0 {
                    xml.push_str("<w:br/>");
                }
                let _ = write!(xml, r#"<w:t xml:space="preserve">{}</w:t>"#, escape(line));
            }
            xml.push_str("</w:r></w:p>");
        }

        xml.push_str(r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#);
        xml
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        OoxmlPackage::from_parts([
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes().to_vec()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes().to_vec()),
            ("word/document.xml", self.document_xml().into_bytes()),
        ])
        .to_bytes()
    }
}
