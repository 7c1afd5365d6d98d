//! DeepL document translation.

mod client;

pub use client::{DeeplClient, DocumentHandle, DocumentState};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Lang;
use crate::error::Result;
use crate::glossary::Glossary;

/// Identifier returned by DeepL for a stored glossary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlossaryId(pub String);

impl GlossaryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GlossaryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Machine translation of whole documents.
#[async_trait]
pub trait DocumentTranslator: Send + Sync {
    /// Store `glossary` on the service for one language pair.
    async fn create_glossary(
        &self,
        name: &str,
        source: &Lang,
        target: &Lang,
        glossary: &Glossary,
    ) -> Result<GlossaryId>;

    /// Translate a document and return the translated file's bytes.
    async fn translate_document(
        &self,
        document: Vec<u8>,
        filename: &str,
        source: &Lang,
        target: &Lang,
        glossary: Option<&GlossaryId>,
    ) -> Result<Vec<u8>>;
}
