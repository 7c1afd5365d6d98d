use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::chunk::TextChunker;
use super::pdf::save_text_pdf;
use super::{prompts, FicheKind};
use crate::config::LlmConfig;
use crate::docx::DocxDocument;
use crate::error::{Error, Result};
use crate::llm::{ChatModel, ChatRequest};
use crate::util::extension_of;

/// Generated sheet in both languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fiche {
    pub kind: FicheKind,
    pub french: String,
    pub english: String,
}

/// Where the PDFs of a fiche were written.
#[derive(Debug, Clone)]
pub struct FichePaths {
    pub french: PathBuf,
    pub english: PathBuf,
}

pub struct FicheGenerator {
    model: Arc<dyn ChatModel>,
    llm: LlmConfig,
    chunker: TextChunker,
}

impl FicheGenerator {
    pub fn new(model: Arc<dyn ChatModel>, llm: LlmConfig) -> Self {
        Self {
            model,
            llm,
            chunker: TextChunker::default(),
        }
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Text of an uploaded `.docx`; other extensions are refused.
    pub fn read_upload(filename: &str, bytes: &[u8]) -> Result<String> {
        if extension_of(filename).as_deref() != Some("docx") {
            return Err(Error::UnsupportedFileType(filename.to_string()));
        }
        Ok(DocxDocument::from_bytes(bytes)?.text())
    }

    /// Analyse every chunk and join the answers. Any failed chunk fails the
    /// whole analysis.
    pub async fn analyze_chunks(&self, text: &str) -> Result<String> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(Error::DocxRead("document contains no text".to_string()));
        }

        let total = chunks.len();
        info!("Analysing {} chunk(s)", total);

        let mut analysis = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let request = ChatRequest::new(&self.llm, prompts::analysis(chunk, i + 1, total))
                .with_system(prompts::ANALYSIS_SYSTEM);
            let part = self.model.complete(&request).await?;
            debug!("Chunk {}/{} analysed ({} chars)", i + 1, total, part.len());

            if !analysis.is_empty() {
                analysis.push_str("\n\n");
            }
            let _ = write!(analysis, "--- Part {}/{} ---\n{}", i + 1, total, part);
        }
        Ok(analysis)
    }

    /// Write the sheet twice: once in French, once in English.
    pub async fn generate(&self, analysis: &str, kind: FicheKind) -> Result<Fiche> {
        let ask = |language: &str| {
            ChatRequest::new(&self.llm, prompts::fiche(kind, analysis, language))
                .with_system(prompts::COPYWRITER_SYSTEM)
        };

        let french = self.model.complete(&ask("Français")).await?;
        let english = self.model.complete(&ask("Anglais")).await?;
        info!("Generated {:?} fiche", kind);

        Ok(Fiche {
            kind,
            french,
            english,
        })
    }

    /// Save `french.pdf` and `english.pdf` into `dir`.
    pub fn save_pdfs(fiche: &Fiche, dir: &Path) -> Result<FichePaths> {
        let paths = FichePaths {
            french: dir.join("french.pdf"),
            english: dir.join("english.pdf"),
        };
        save_text_pdf(&paths.french, fiche.kind.title(), &fiche.french)?;
        save_text_pdf(&paths.english, fiche.kind.title(), &fiche.english)?;
        Ok(paths)
    }
}
