//! The full translation job: glossary, machine translation, post-edit.

use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::CompletionCache;
use crate::config::{AppConfig, Lang};
use crate::deepl::{DeeplClient, DocumentTranslator};
use crate::error::{Error, Result};
use crate::glossary::Glossary;
use crate::llm::create_chat_model;
use crate::postedit::{PostEditOptions, PostEditReport, PostEditor};
use crate::status::JobStage;

/// Progress event emitted while a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineProgress {
    Stage(JobStage),
    Paragraphs { done: usize, total: usize },
}

/// Everything a job needs besides the document itself.
#[derive(Debug, Clone)]
pub struct TranslationOptions {
    pub source_lang: Lang,
    pub target_lang: Lang,
    /// Sent to DeepL as a stored glossary
    pub deepl_glossary: Option<Glossary>,
    /// Embedded in the post-edit prompt
    pub prompt_glossary: Glossary,
    pub language_level: String,
    pub group_size: usize,
    pub model: String,
    pub post_edit: bool,
}

impl TranslationOptions {
    /// Options with the configured post-edit defaults.
    pub fn new(config: &AppConfig, source_lang: Lang, target_lang: Lang) -> Self {
        Self {
            source_lang,
            target_lang,
            deepl_glossary: None,
            prompt_glossary: Glossary::new(),
            language_level: config.post_edit.language_level.clone(),
            group_size: config.post_edit.group_size,
            model: config.llm.model.clone(),
            post_edit: true,
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, lang) in [("source_language", &self.source_lang), ("target_language", &self.target_lang)] {
            if lang.is_empty() {
                return Err(Error::ConfigInvalid {
                    field: field.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if self.post_edit && self.group_size == 0 {
            return Err(Error::ConfigInvalid {
                field: "group_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn post_edit_options(&self) -> PostEditOptions {
        PostEditOptions {
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            language_level: self.language_level.clone(),
            group_size: self.group_size,
            model: self.model.clone(),
            glossary: self.prompt_glossary.clone(),
        }
    }
}

/// Result of a job.
#[derive(Debug, Clone)]
pub struct TranslationOutput {
    /// The DeepL document, kept even when post-editing ran
    pub translated: Vec<u8>,
    pub improved: Option<Vec<u8>>,
    pub report: Option<PostEditReport>,
}

impl TranslationOutput {
    /// The document to hand to the user.
    pub fn final_document(&self) -> &[u8] {
        self.improved.as_deref().unwrap_or(&self.translated)
    }
}

pub struct TranslationPipeline {
    translator: Arc<dyn DocumentTranslator>,
    editor: PostEditor,
    glossary_name: String,
}

impl TranslationPipeline {
    pub fn new(translator: Arc<dyn DocumentTranslator>, editor: PostEditor, glossary_name: impl Into<String>) -> Self {
        Self {
            translator,
            editor,
            glossary_name: glossary_name.into(),
        }
    }

    /// Pipeline backed by DeepL and the configured chat model.
    pub fn from_config(config: &AppConfig, cache: Arc<CompletionCache>) -> Result<Self> {
        let translator = Arc::new(DeeplClient::new(&config.deepl)?);
        let model = create_chat_model(&config.llm)?;
        let editor = PostEditor::new(model, config.llm.clone()).with_cache(cache);
        Ok(Self::new(translator, editor, config.deepl.glossary_name.clone()))
    }

    pub async fn run(
        &self,
        document: Vec<u8>,
        filename: &str,
        options: &TranslationOptions,
        progress: &(dyn Fn(PipelineProgress) + Send + Sync),
    ) -> Result<TranslationOutput> {
        options.validate()?;

        let glossary_id = match options.deepl_glossary {
            Some(ref glossary) if glossary.is_empty() => {
                warn!("DeepL glossary has no entries, translating without it");
                None
            }
            Some(ref glossary) => {
                progress(PipelineProgress::Stage(JobStage::Glossary));
                let id = self
                    .translator
                    .create_glossary(&self.glossary_name, &options.source_lang, &options.target_lang, glossary)
                    .await
                    .map_err(|e| e.at_stage(JobStage::Glossary))?;
                Some(id)
            }
            None => None,
        };

        progress(PipelineProgress::Stage(JobStage::MachineTranslation));
        let translated = self
            .translator
            .translate_document(
                document,
                filename,
                &options.source_lang,
                &options.target_lang,
                glossary_id.as_ref(),
            )
            .await
            .map_err(|e| e.at_stage(JobStage::MachineTranslation))?;
        info!("Initial translation of {} done ({} bytes)", filename, translated.len());

        if !options.post_edit {
            progress(PipelineProgress::Stage(JobStage::Finished));
            return Ok(TranslationOutput {
                translated,
                improved: None,
                report: None,
            });
        }

        progress(PipelineProgress::Stage(JobStage::PostEdit));
        let (improved, report) = self
            .editor
            .improve_document(&translated, &options.post_edit_options(), &|done, total| {
                progress(PipelineProgress::Paragraphs { done, total });
            })
            .await
            .map_err(|e| e.at_stage(JobStage::PostEdit))?;

        if !report.skipped_groups.is_empty() {
            warn!(
                "{} of {} groups were left out of the improved document",
                report.skipped_groups.len(),
                report.groups
            );
        }

        progress(PipelineProgress::Stage(JobStage::Finished));
        Ok(TranslationOutput {
            translated,
            improved: Some(improved),
            report: Some(report),
        })
    }
}
