//! Language-model post-editing of a machine-translated document.
//!
//! Non-empty paragraphs are sent in consecutive groups; each group's answer
//! becomes one paragraph of the output document. A failed group is skipped
//! so one bad call does not lose the whole job.

use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CompletionCache, CompletionInputs};
use crate::config::{Lang, LlmConfig};
use crate::docx::{DocxDocument, DocxWriter};
use crate::error::{Error, Result};
use crate::glossary::Glossary;
use crate::llm::{ChatModel, ChatRequest};

pub const SYSTEM_PROMPT: &str = "You are a skilled translator and editor.";

/// Settings for one post-edit run.
#[derive(Debug, Clone)]
pub struct PostEditOptions {
    pub source_lang: Lang,
    pub target_lang: Lang,
    pub language_level: String,
    pub group_size: usize,
    pub model: String,
    pub glossary: Glossary,
}

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostEditReport {
    pub groups: usize,
    /// 1-based numbers of the groups left out of the output
    pub skipped_groups: Vec<usize>,
    pub cache_hits: usize,
}

pub struct PostEditor {
    model: Arc<dyn ChatModel>,
    llm: LlmConfig,
    cache: Arc<CompletionCache>,
}

impl PostEditor {
    pub fn new(model: Arc<dyn ChatModel>, llm: LlmConfig) -> Self {
        Self {
            model,
            llm,
            cache: Arc::new(CompletionCache::disabled()),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CompletionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn build_prompt(group: &[&str], options: &PostEditOptions, glossary: &str) -> String {
        let mut prompt = format!(
            "Improve the following text translated from {} to {}.\n\
             Language level: {}.\n\
             Glossary to respect: {}.\n\
             Here is the text:\n\n",
            options.source_lang, options.target_lang, options.language_level, glossary
        );
        for paragraph in group {
            let _ = write!(prompt, "{paragraph}\n\n");
        }
        prompt
    }

    /// Improve `paragraphs` group by group.
    ///
    /// `progress` is called with `(paragraphs_done, paragraphs_total)` after
    /// every group, skipped or not.
    pub async fn improve_paragraphs(
        &self,
        paragraphs: &[&str],
        options: &PostEditOptions,
        progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<(Vec<String>, PostEditReport)> {
        if options.group_size == 0 {
            return Err(Error::ConfigInvalid {
                field: "group_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let total = paragraphs.len();
        let glossary = options.glossary.prompt_fragment();
        let mut improved = Vec::new();
        let mut report = PostEditReport::default();
        let mut done = 0;

        info!(
            "Post-editing {} paragraphs in groups of {} with {}",
            total, options.group_size, options.model
        );

        for (index, group) in paragraphs.chunks(options.group_size).enumerate() {
            let group_number = index + 1;
            report.groups += 1;

            match self.improve_group(group, options, &glossary).await {
                Ok((text, from_cache)) => {
                    if from_cache {
                        report.cache_hits += 1;
                    }
                    improved.push(text);
                }
                Err(e) => {
                    warn!("Skipping group {} due to an error: {}", group_number, e);
                    report.skipped_groups.push(group_number);
                }
            }

            done += group.len();
            progress(done, total);
        }

        if report.groups > 0 && report.skipped_groups.len() == report.groups {
            return Err(Error::PostEditFailed {
                groups: report.groups,
            });
        }

        Ok((improved, report))
    }

    async fn improve_group(
        &self,
        group: &[&str],
        options: &PostEditOptions,
        glossary: &str,
    ) -> Result<(String, bool)> {
        let group_text = group.join("\n\n");
        let key = CacheKey::new(&CompletionInputs {
            group_text: &group_text,
            model: &options.model,
            source_lang: &options.source_lang,
            target_lang: &options.target_lang,
            language_level: &options.language_level,
            glossary,
        });

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Cache hit for group {}", key);
            return Ok((cached, true));
        }

        let request = ChatRequest::new(&self.llm, Self::build_prompt(group, options, glossary))
            .with_system(SYSTEM_PROMPT)
            .with_model(&options.model);
        let text = self.model.complete(&request).await?;
        if text.trim().is_empty() {
            return Err(Error::LlmInvalidResponse("empty completion".to_string()));
        }

        self.cache.insert(&key, &text).await;
        Ok((text, false))
    }

    /// Post-edit a translated `.docx` and return the improved `.docx`.
    pub async fn improve_document(
        &self,
        translated: &[u8],
        options: &PostEditOptions,
        progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<(Vec<u8>, PostEditReport)> {
        let document = DocxDocument::from_bytes(translated)?;
        let paragraphs = document.non_empty_paragraphs();
        info!("Loaded {} paragraphs from the translated document", paragraphs.len());

        let (improved, report) = self.improve_paragraphs(&paragraphs, options, progress).await?;

        let mut writer = DocxWriter::new();
        for paragraph in &improved {
            writer.add_paragraph(paragraph.as_str());
        }
        Ok((writer.to_bytes()?, report))
    }
}
