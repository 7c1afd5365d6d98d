//! Document Translator Core Library
//!
//! This library provides the core functionality for translating Word documents:
//! - DOCX reading and writing, glossary parsing
//! - Machine translation through the DeepL document API
//! - Post-editing with OpenAI-compatible chat models (cached in memory and on disk)
//! - Job status, history, cost estimates and marketing fiches

pub mod cache;
pub mod calculator;
pub mod config;
pub mod deepl;
pub mod docx;
pub mod error;
pub mod fiche;
pub mod glossary;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod postedit;
pub mod status;
pub mod util;

pub use cache::{CacheKey, CompletionCache, clear_post_edit_cache};
pub use calculator::{CostEstimate, Reviewer};
pub use config::{
    AppConfig, Lang, LanguageOption, language_levels, source_languages, supported_models,
    target_languages, DEFAULT_MODEL, DEFAULT_OUTPUT_FILE_NAME,
};
pub use deepl::{DeeplClient, DocumentTranslator, GlossaryId};
pub use docx::{DocStats, DocxDocument, DocxWriter};
pub use error::{Error, Result};
pub use fiche::{Fiche, FicheGenerator, FicheKind};
pub use glossary::Glossary;
pub use history::{HistoryStore, TranslatedFile};
pub use llm::{ChatModel, ChatRequest, OpenAiChat, create_chat_model};
pub use pipeline::{PipelineProgress, TranslationOptions, TranslationOutput, TranslationPipeline};
pub use postedit::{PostEditOptions, PostEditReport, PostEditor};
pub use status::{JobStage, JobState, JobStatus, Progress};
