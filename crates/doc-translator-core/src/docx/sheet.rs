//! Minimal SpreadsheetML reader: the cell text of the first worksheet.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::package::OoxmlPackage;
use crate::error::{Error, Result};

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";

/// Rows of the first worksheet as sparse text columns.
///
/// Each row is indexed by column (A = 0); missing cells are empty strings.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let package = OoxmlPackage::from_bytes(bytes)?;

    let shared = match package.part(SHARED_STRINGS_PART) {
        Some(xml) => read_shared_strings(xml)?,
        None => Vec::new(),
    };

    let sheet_name = package
        .part_names_with_prefix(WORKSHEET_PREFIX)
        .into_iter()
        .min_by_key(|name| sheet_number(name))
        .ok_or_else(|| Error::DocxRead("workbook has no worksheet".to_string()))?;

    let xml = package
        .part(sheet_name)
        .ok_or_else(|| Error::DocxRead(format!("missing {sheet_name}")))?;

    read_rows(xml, &shared)
}

fn sheet_number(name: &str) -> u32 {
    name.trim_start_matches(WORKSHEET_PREFIX)
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(u32::MAX)
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::DocxRead(format!("malformed spreadsheet: {e}"))
}

fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    // Phonetic runs repeat the text in another script
    let mut in_phonetic = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(e) => match e.name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Text(t) if in_text && !in_phonetic => {
                if let Some(ref mut s) = current {
                    s.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            _ => {}
        }
    }

    Ok(strings)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Shared,
    Inline,
    Literal,
}

struct OpenCell {
    column: usize,
    kind: CellKind,
    value: String,
}

fn read_rows(xml: &[u8], shared: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<OpenCell> = None;
    let mut next_column = 0;
    let mut in_value = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(e) => match e.name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_column = 0;
                }
                b"c" => {
                    let (column, kind) = cell_header(&e, next_column)?;
                    cell = Some(OpenCell {
                        column,
                        kind,
                        value: String::new(),
                    });
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    let (column, _) = cell_header(&e, next_column)?;
                    next_column = column + 1;
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(open), Some(cells)) = (cell.take(), row.as_mut()) {
                        next_column = open.column + 1;
                        let text = resolve_cell(&open, shared);
                        if cells.len() <= open.column {
                            cells.resize(open.column + 1, String::new());
                        }
                        cells[open.column] = text;
                    }
                }
                b"row" => {
                    if let Some(cells) = row.take() {
                        rows.push(cells);
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(ref mut open) = cell {
                    open.value.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            _ => {}
        }
    }

    Ok(rows)
}

fn cell_header(e: &BytesStart<'_>, fallback_column: usize) -> Result<(usize, CellKind)> {
    let mut column = fallback_column;
    let mut kind = CellKind::Literal;

    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?;
        match attr.key.as_ref() {
            b"r" => {
                if let Some(c) = column_index(&value) {
                    column = c;
                }
            }
            b"t" => {
                kind = match value.as_ref() {
                    "s" => CellKind::Shared,
                    "inlineStr" => CellKind::Inline,
                    _ => CellKind::Literal,
                };
            }
            _ => {}
        }
    }

    Ok((column, kind))
}

fn resolve_cell(cell: &OpenCell, shared: &[String]) -> String {
    match cell.kind {
        CellKind::Shared => cell
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        CellKind::Inline | CellKind::Literal => cell.value.clone(),
    }
}

/// Zero-based column of a cell reference such as `B12`.
fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn workbook(shared: &str, sheet: &str) -> Vec<u8> {
        OoxmlPackage::from_parts([
            ("xl/sharedStrings.xml", shared.as_bytes().to_vec()),
            ("xl/worksheets/sheet1.xml", sheet.as_bytes().to_vec()),
        ])
        .to_bytes()
        .unwrap()
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("b7"), Some(1));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("12"), None);
    }

    #[test]
    fn test_reads_shared_inline_and_numeric_cells() {
        let shared = r#"<sst><si><t>chat</t></si><si><r><t>ca</t></r><r><t>t</t></r></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="A2" t="inlineStr"><is><t>chien &amp; co</t></is></c><c r="C2"><v>42</v></c></row>
        </sheetData></worksheet>"#;

        let rows = read_first_sheet(&workbook(shared, sheet)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["chat", "cat"]);
        assert_eq!(rows[1], vec!["chien & co", "", "42"]);
    }

    #[test]
    fn test_workbook_without_sheet_is_an_error() {
        let bytes = OoxmlPackage::from_parts([("xl/workbook.xml", b"<workbook/>".to_vec())])
            .to_bytes()
            .unwrap();
        assert!(read_first_sheet(&bytes).is_err());
    }
}
