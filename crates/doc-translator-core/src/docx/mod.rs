//! Office Open XML handling: reading and writing .docx text, reading .xlsx cells.

pub mod document;
pub mod package;
pub mod sheet;
pub mod writer;

pub use document::{DocStats, DocxDocument};
pub use package::OoxmlPackage;
pub use writer::DocxWriter;
