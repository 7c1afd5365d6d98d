use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// An Office Open XML package (.docx / .xlsx) held in memory.
pub struct OoxmlPackage {
    pub entries: Vec<PackageEntry>,
}

pub struct PackageEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl OoxmlPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::DocxRead(format!("not a zip package: {e}")))?;

        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip
                .by_index(i)
                .map_err(|e| Error::DocxRead(format!("zip entry {i}: {e}")))?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)
                .map_err(|e| Error::DocxRead(format!("read {}: {e}", file.name())))?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
            });
        }

        Ok(Self { entries })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Build a package from (name, content) pairs.
    pub fn from_parts<I, N, D>(parts: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        Self {
            entries: parts
                .into_iter()
                .map(|(name, data)| PackageEntry {
                    name: name.into(),
                    data: data.into(),
                })
                .collect(),
        }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Names of the parts matching a prefix, sorted.
    pub fn part_names_with_prefix(&self, prefix: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .iter()
            .map(|e| e.name.as_str())
            .filter(|n| n.starts_with(prefix))
            .collect();
        names.sort_unstable();
        names
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            zout.start_file(entry.name.as_str(), opts)
                .map_err(|e| Error::DocxWrite(format!("start {}: {e}", entry.name)))?;
            zout.write_all(&entry.data)
                .map_err(|e| Error::DocxWrite(format!("write {}: {e}", entry.name)))?;
        }

        let cursor = zout
            .finish()
            .map_err(|e| Error::DocxWrite(format!("finish zip: {e}")))?;
        Ok(cursor.into_inner())
    }
}
