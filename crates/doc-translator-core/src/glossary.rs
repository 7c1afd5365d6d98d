//! Source→target term lists.
//!
//! A glossary reaches the system in two roles: as a DeepL glossary (CSV,
//! TSV or an Excel sheet converted to CSV) and as a constraint embedded in
//! the post-editing prompt (usually a Word file with `source: target` lines).

use indexmap::IndexMap;
use std::fmt::Write;

use crate::docx::{sheet, DocxDocument};
use crate::error::{Error, Result};
use crate::util::extension_of;

/// Term map in upload order. A repeated source keeps its first position and
/// takes the later target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Glossary {
    entries: IndexMap<String, String>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into().trim().to_string();
        if source.is_empty() {
            return;
        }
        self.entries.insert(source, target.into().trim().to_string());
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Paragraphs of the form `source: target`; the first colon splits.
    pub fn from_docx(bytes: &[u8]) -> Result<Self> {
        let doc = DocxDocument::from_bytes(bytes)
            .map_err(|e| Error::GlossaryParse(format!("cannot read glossary document: {e}")))?;
        Ok(Self::from_colon_lines(doc.paragraphs().iter().map(String::as_str)))
    }

    /// Plain-text variant of [`Glossary::from_docx`].
    pub fn from_colon_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut glossary = Self::new();
        for line in lines {
            if let Some((source, target)) = line.split_once(':') {
                glossary.insert(source, target);
            }
        }
        glossary
    }

    /// Two-column CSV; a tab separator is accepted when no comma is present.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut glossary = Self::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_csv_line(line);
            match fields.as_slice() {
                [source, target, ..] => glossary.insert(source.as_str(), target.as_str()),
                _ => {
                    return Err(Error::GlossaryParse(format!(
                        "line {} has fewer than two columns",
                        line_no + 1
                    )));
                }
            }
        }
        Ok(glossary)
    }

    /// First two columns of the first worksheet, no header row.
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self> {
        let rows = sheet::read_first_sheet(bytes)
            .map_err(|e| Error::GlossaryParse(format!("cannot read workbook: {e}")))?;
        let mut glossary = Self::new();
        for row in rows {
            if let [source, target, ..] = row.as_slice() {
                glossary.insert(source.as_str(), target.as_str());
            }
        }
        Ok(glossary)
    }

    /// Pick the parser from the uploaded file's extension.
    pub fn from_upload(filename: &str, bytes: &[u8]) -> Result<Self> {
        let text = || {
            String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::GlossaryParse(format!("{filename} is not valid UTF-8")))
        };
        match extension_of(filename).as_deref() {
            Some("csv" | "tsv") => Self::from_csv(&text()?),
            Some("txt") => Ok(Self::from_colon_lines(text()?.lines())),
            Some("xlsx") => Self::from_xlsx(bytes),
            Some("docx") => Self::from_docx(bytes),
            _ => Err(Error::GlossaryFormat(filename.to_string())),
        }
    }

    /// `source,target` lines as expected by DeepL's `entries_format=csv`.
    pub fn to_deepl_csv(&self) -> String {
        let mut out = String::new();
        for (source, target) in self.iter() {
            let _ = writeln!(out, "{},{}", csv_field(source), csv_field(target));
        }
        out
    }

    /// Rendering used inside the post-editing prompt: `{'a': 'b', ...}`.
    pub fn prompt_fragment(&self) -> String {
        let body = self
            .iter()
            .map(|(s, t)| format!("{}: {}", quoted(s), quoted(t)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{body}}}")
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for Glossary {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut glossary = Self::new();
        for (s, t) in iter {
            glossary.insert(s, t);
        }
        glossary
    }
}

/// String literal as Python's `repr` writes it: single quotes unless the
/// value contains one and no double quote.
fn quoted(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn split_csv_line(line: &str) -> Vec<String> {
    let separator = if !line.contains(',') && line.contains('\t') {
        '\t'
    } else {
        ','
    };

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == separator && !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::docx::{DocxWriter, OoxmlPackage};

    #[test]
    fn test_colon_lines_split_on_first_colon() {
        let glossary = Glossary::from_colon_lines([
            "tableau de bord : dashboard",
            "no separator here",
            "ratio: 1:2 scale",
            " : orphan",
        ]);
        assert_eq!(glossary.len(), 2);
        assert_eq!(glossary.get("tableau de bord"), Some("dashboard"));
        assert_eq!(glossary.get("ratio"), Some("1:2 scale"));
    }

    #[test]
    fn test_later_duplicates_win() {
        let glossary = Glossary::from_colon_lines(["chat: cat", "chat: kitty"]);
        assert_eq!(glossary.get("chat"), Some("kitty"));
    }

    #[test]
    fn test_from_docx_reads_paragraphs() {
        let mut writer = DocxWriter::new();
        writer.add_paragraph("devis: quote").add_paragraph("facture: invoice");
        let glossary = Glossary::from_docx(&writer.to_bytes().unwrap()).unwrap();
        assert_eq!(glossary.get("devis"), Some("quote"));
        assert_eq!(glossary.get("facture"), Some("invoice"));
    }

    #[test]
    fn test_csv_with_quotes_and_tabs() {
        let glossary =
            Glossary::from_csv("\"prix, TTC\",\"price incl. \"\"VAT\"\"\"\r\n\nremise\tdiscount\n")
                .unwrap();
        assert_eq!(glossary.get("prix, TTC"), Some("price incl. \"VAT\""));
        assert_eq!(glossary.get("remise"), Some("discount"));
    }

    #[test]
    fn test_csv_single_column_is_rejected() {
        assert!(matches!(Glossary::from_csv("only-one\n"), Err(Error::GlossaryParse(_))));
    }

    #[test]
    fn test_xlsx_conversion() {
        let shared = r#"<sst><si><t>bon de commande</t></si><si><t>purchase order</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row></sheetData></worksheet>"#;
        let bytes = OoxmlPackage::from_parts([
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ])
        .to_bytes()
        .unwrap();

        let glossary = Glossary::from_upload("terms.XLSX", &bytes).unwrap();
        assert_eq!(glossary.get("bon de commande"), Some("purchase order"));
        assert_eq!(glossary.to_deepl_csv(), "bon de commande,purchase order\n");
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        assert!(matches!(
            Glossary::from_upload("terms.pdf", b"%PDF"),
            Err(Error::GlossaryFormat(_))
        ));
    }

    #[test]
    fn test_deepl_csv_quotes_fields() {
        let glossary: Glossary = [("a,b", "c\"d")].into_iter().collect();
        assert_eq!(glossary.to_deepl_csv(), "\"a,b\",\"c\"\"d\"\n");
    }

    #[test]
    fn test_prompt_fragment() {
        assert_eq!(Glossary::new().prompt_fragment(), "{}");
        let glossary: Glossary = [("chat", "cat"), ("chien", "dog")].into_iter().collect();
        assert_eq!(glossary.prompt_fragment(), "{'chat': 'cat', 'chien': 'dog'}");

        let glossary = Glossary::from_colon_lines(["zebra: zèbre", "apple: pomme", "zebra: zèbre rayé"]);
        assert_eq!(glossary.prompt_fragment(), "{'zebra': 'zèbre rayé', 'apple': 'pomme'}");
        assert_eq!(glossary.to_deepl_csv(), "zebra,zèbre rayé\napple,pomme\n");
    }

    #[test]
    fn test_prompt_fragment_quotes_like_python() {
        let glossary: Glossary = [("l'eau", "water"), ("say \"hi\"", "it's \"x\"")]
            .into_iter()
            .collect();
        assert_eq!(
            glossary.prompt_fragment(),
            r#"{"l'eau": 'water', 'say "hi"': 'it\'s "x"'}"#
        );
    }
}
