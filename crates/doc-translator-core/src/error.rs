use thiserror::Error;

use crate::status::JobStage;

/// Unified error type for doc-translator-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - DOCX and glossary parsing
/// - DeepL document API calls (upload, polling, download, glossaries)
/// - Chat-model calls used for post-editing and fiche generation
/// - Cache and history storage
/// - Configuration loading and validation
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// Failed to open or parse a .docx package
    #[error("failed to read DOCX: {0}")]
    DocxRead(String),

    /// Failed to build a .docx package
    #[error("failed to write DOCX: {0}")]
    DocxWrite(String),

    /// Uploaded file does not have an accepted extension
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    // ==========================================================================
    // Glossary Errors
    // ==========================================================================
    /// Glossary file format not recognised
    #[error("unsupported glossary format: {0}")]
    GlossaryFormat(String),

    /// Glossary content could not be parsed
    #[error("failed to parse glossary: {0}")]
    GlossaryParse(String),

    // ==========================================================================
    // DeepL Errors
    // ==========================================================================
    /// DeepL API key not configured
    #[error("DeepL API key not configured")]
    DeeplMissingApiKey,

    /// Glossary creation was rejected
    #[error("failed to create glossary: {0}")]
    DeeplGlossary(String),

    /// Document upload was rejected
    #[error("failed to upload document: {0}")]
    DeeplUpload(String),

    /// Status check failed or the job reported an error
    #[error("document translation failed: {0}")]
    DeeplTranslation(String),

    /// Translated document could not be downloaded
    #[error("failed to download translated document: {0}")]
    DeeplDownload(String),

    /// Job did not finish in the configured time
    #[error("document translation did not finish within {0} seconds")]
    DeeplTimeout(u64),

    /// Character quota exhausted (HTTP 456)
    #[error("DeepL quota exceeded")]
    DeeplQuotaExceeded,

    /// Transport-level failure talking to DeepL
    #[error("DeepL request failed: {0}")]
    DeeplRequest(String),

    // ==========================================================================
    // Language Model Errors
    // ==========================================================================
    /// Chat-completion request failed
    #[error("language model request failed: {0}")]
    LlmRequest(String),

    /// Invalid response from the chat-completion API
    #[error("invalid language model response: {0}")]
    LlmInvalidResponse(String),

    /// Rate limited by the chat-completion API
    #[error("language model rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    LlmRateLimited { retry_after: Option<u64> },

    /// Chat-completion request timed out
    #[error("language model request timed out")]
    LlmTimeout,

    /// Maximum retry attempts exceeded
    #[error("language model failed after maximum retries")]
    LlmMaxRetriesExceeded,

    // ==========================================================================
    // Workflow Errors
    // ==========================================================================
    /// Every post-edit group failed
    #[error("post-editing failed for all {groups} paragraph groups")]
    PostEditFailed { groups: usize },

    /// A pipeline stage failed
    #[error("{}: {source}", stage.failure_message())]
    Pipeline {
        stage: JobStage,
        #[source]
        source: Box<Error>,
    },

    /// Unknown fiche action
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Reviewer name not recognised by the calculator
    #[error("invalid reviewer choice: {0}")]
    InvalidReviewer(String),

    /// Failed to build a PDF
    #[error("failed to write PDF: {0}")]
    PdfWrite(String),

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    /// Failed to open the history store
    #[error("failed to open history: {0}")]
    HistoryInit(String),

    /// Failed to read or write history entries
    #[error("history storage error: {0}")]
    History(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an error as a failure of the given pipeline stage.
    pub fn at_stage(self, stage: JobStage) -> Self {
        Self::Pipeline {
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
