//! Typed job status.
//!
//! One record per job, replaced wholesale on every update. Readers see the
//! last value written.

use serde::{Deserialize, Serialize};

/// Coarse state reported to polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    InProgress,
    Done,
    Error,
}

/// Step of the translation pipeline a job is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    #[default]
    Queued,
    Glossary,
    MachineTranslation,
    PostEdit,
    Finished,
}

impl JobStage {
    /// Human-readable description of the stage, used in status messages.
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Queued => "Waiting to start",
            Self::Glossary => "Creating glossary",
            Self::MachineTranslation => "Translating document",
            Self::PostEdit => "Improving translation",
            Self::Finished => "Finished",
        }
    }

    /// Prefix used when an error escapes this stage.
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Queued => "job could not start",
            Self::Glossary => "glossary creation failed",
            Self::MachineTranslation => "initial translation failed",
            Self::PostEdit => "translation improvement failed",
            Self::Finished => "saving the result failed",
        }
    }
}

/// Paragraph progress within the post-edit stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.done.min(self.total) * 100) / self.total;
        u8::try_from(pct).unwrap_or(100)
    }
}

/// Snapshot of a job, serialised as-is to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    pub message: String,
    pub stage: JobStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_name: Option<String>,
}

impl JobStatus {
    pub fn idle() -> Self {
        Self {
            status: JobState::Idle,
            message: "No translation in progress".to_string(),
            stage: JobStage::Queued,
            progress: None,
            output_file_name: None,
        }
    }

    pub fn started() -> Self {
        Self {
            status: JobState::InProgress,
            message: "Translation in progress...".to_string(),
            ..Self::idle()
        }
    }

    pub fn stage(stage: JobStage, progress: Option<Progress>) -> Self {
        Self {
            status: JobState::InProgress,
            message: stage.describe().to_string(),
            stage,
            progress,
            output_file_name: None,
        }
    }

    pub fn done(output_file_name: impl Into<String>) -> Self {
        Self {
            status: JobState::Done,
            message: "Translation completed".to_string(),
            stage: JobStage::Finished,
            progress: None,
            output_file_name: Some(output_file_name.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobState::Error,
            message: message.into(),
            ..Self::idle()
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobState::Done | JobState::Error)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::idle()
    }
}
