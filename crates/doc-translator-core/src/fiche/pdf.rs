//! Plain-text PDF output for fiches.
//!
//! One built-in Type1 font, WinAnsi-encoded, greedy word wrap, as many A4
//! pages as the text needs.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

use crate::error::{Error, Result};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const BODY_SIZE: i64 = 12;
const TITLE_SIZE: i64 = 16;
const LEADING: i64 = 15;
/// Helvetica averages about half an em per glyph.
const MAX_CHARS: usize = 80;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Render `title` and `body` as a PDF document.
pub fn render_text_pdf(title: &str, body: &str) -> Result<Vec<u8>> {
    let mut lines = Vec::new();
    for paragraph in body.lines() {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
        } else {
            lines.extend(word_wrap(paragraph, MAX_CHARS));
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(font("Helvetica"));
    let bold = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([
            ("F1", Object::Reference(regular)),
            ("F2", Object::Reference(bold)),
        ])),
    )]));

    // The title takes two body lines on the first page.
    let mut pages: Vec<&[String]> = Vec::new();
    let first_len = lines.len().min(LINES_PER_PAGE.saturating_sub(2));
    pages.push(&lines[..first_len]);
    pages.extend(lines[first_len..].chunks(LINES_PER_PAGE));

    let mut kids = Vec::with_capacity(pages.len());
    for (index, page_lines) in pages.iter().enumerate() {
        let page_title = (index == 0 && !title.trim().is_empty()).then_some(title);
        let content = page_content(page_title, page_lines)
            .encode()
            .map_err(|e| Error::PdfWrite(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        kids.push(add_page(&mut doc, pages_id, content_id, resources_id));
    }

    let count = i64::try_from(kids.len()).map_err(|e| Error::PdfWrite(e.to_string()))?;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids.into_iter().map(Object::Reference).collect())),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.compress();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::PdfWrite(e.to_string()))?;
    Ok(output)
}

/// Render and write to `path`, creating parent directories.
pub fn save_text_pdf(path: impl AsRef<Path>, title: &str, body: &str) -> Result<()> {
    let path = path.as_ref();
    let bytes = render_text_pdf(title, body)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

fn font(base: &str) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(base.as_bytes().to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

fn add_page(doc: &mut Document, parent: ObjectId, content: ObjectId, resources: ObjectId) -> ObjectId {
    doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(parent)),
        ("Contents", Object::Reference(content)),
        ("Resources", Object::Reference(resources)),
        (
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()]),
        ),
    ]))
}

fn page_content(title: Option<&str>, lines: &[String]) -> Content {
    let mut operations = vec![Operation::new("BT", vec![])];
    operations.push(Operation::new("TL", vec![LEADING.into()]));
    operations.push(Operation::new(
        "Td",
        vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN - TITLE_SIZE).into()],
    ));

    if let Some(title) = title {
        operations.push(Operation::new("Tf", vec!["F2".into(), TITLE_SIZE.into()]));
        operations.push(Operation::new("Tj", vec![pdf_string(title)]));
        operations.push(Operation::new("T*", vec![]));
        operations.push(Operation::new("T*", vec![]));
    }

    operations.push(Operation::new("Tf", vec!["F1".into(), BODY_SIZE.into()]));
    for line in lines {
        if !line.is_empty() {
            operations.push(Operation::new("Tj", vec![pdf_string(line)]));
        }
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
}

fn pdf_string(text: &str) -> Object {
    Object::String(encode_win_ansi(text), StringFormat::Literal)
}

/// Map text to WinAnsi bytes; characters outside the code page become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(c)).unwrap_or(b'?'),
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

/// Greedy wrap at `max_chars`; words longer than a line are cut.
fn word_wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            lines.push(word.drain(..max_chars).collect());
        }
        if word.is_empty() {
            continue;
        }

        if current.is_empty() {
            current = word.iter().collect();
            current_len = word.len();
        } else if current_len + 1 + word.len() <= max_chars {
            current.push(' ');
            current.extend(word.iter());
            current_len += 1 + word.len();
        } else {
            lines.push(std::mem::replace(&mut current, word.iter().collect()));
            current_len = word.len();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
