use anyhow::{Context, Result};
use doc_translator_core::{
    AppConfig, ChatModel, CompletionCache, DeeplClient, DocumentTranslator, FicheGenerator,
    HistoryStore, JobStatus, PostEditor, TranslationPipeline, create_chat_model,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Jobs older than this are forgotten by the cleanup task.
pub const JOB_MAX_AGE: Duration = Duration::from_secs(6 * 60 * 60);

/// Status of one translation job.
///
/// The pipeline reports progress from a synchronous callback, so the status
/// sits behind a std lock that is never held across an `.await`.
pub struct Job {
    status: StdRwLock<JobStatus>,
    pub created_at: Instant,
}

impl Job {
    pub fn new() -> Self {
        Self {
            status: StdRwLock::new(JobStatus::started()),
            created_at: Instant::now(),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, status: JobStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

/// External services the routes talk to.
#[derive(Clone)]
pub struct Backends {
    pub translator: Arc<dyn DocumentTranslator>,
    pub chat: Arc<dyn ChatModel>,
}

impl Backends {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            translator: Arc::new(DeeplClient::new(&config.deepl).context("Failed to create DeepL client")?),
            chat: create_chat_model(&config.llm).context("Failed to create chat model")?,
        })
    }
}

/// Global application state
pub struct AppState {
    /// Translation jobs indexed by UUID
    jobs: RwLock<HashMap<Uuid, Arc<Job>>>,
    /// Most recently started job, reported by `/check_status`
    latest: RwLock<Option<Uuid>>,
    pub config: AppConfig,
    pub history: HistoryStore,
    pub cache: Arc<CompletionCache>,
    backends: Backends,
}

impl AppState {
    /// State backed by DeepL and the configured chat model.
    pub fn new(config: AppConfig) -> Result<Self> {
        let backends = Backends::from_config(&config)?;
        Self::with_backends(config, backends)
    }

    pub fn with_backends(config: AppConfig, backends: Backends) -> Result<Self> {
        for dir in [
            &config.paths.upload_dir,
            &config.paths.download_dir,
            &config.paths.marketing_dir(),
        ] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let history = HistoryStore::open(config.paths.history_path())
            .context("Failed to open translation history")?;
        let cache = Arc::new(CompletionCache::new(&config.cache).context("Failed to open post-edit cache")?);

        Ok(Self {
            jobs: RwLock::new(HashMap::new()),
            latest: RwLock::new(None),
            config,
            history,
            cache,
            backends,
        })
    }

    /// Register a new job and make it the latest one.
    pub async fn create_job(&self) -> (Uuid, Arc<Job>) {
        let id = Uuid::new_v4();
        let job = Arc::new(Job::new());
        self.jobs.write().await.insert(id, Arc::clone(&job));
        *self.latest.write().await = Some(id);
        (id, job)
    }

    /// Get a job by ID string.
    ///
    /// Returns `None` if the ID is not a valid UUID or the job is unknown.
    pub async fn get_job(&self, id: &str) -> Option<Arc<Job>> {
        let uuid = Uuid::parse_str(id).ok()?;
        self.jobs.read().await.get(&uuid).cloned()
    }

    /// Status of the most recent job, idle when there is none.
    pub async fn latest_status(&self) -> JobStatus {
        let latest = *self.latest.read().await;
        match latest {
            Some(id) => self
                .jobs
                .read()
                .await
                .get(&id)
                .map_or_else(JobStatus::idle, |job| job.status()),
            None => JobStatus::idle(),
        }
    }

    pub fn pipeline(&self) -> TranslationPipeline {
        let editor = PostEditor::new(Arc::clone(&self.backends.chat), self.config.llm.clone())
            .with_cache(Arc::clone(&self.cache));
        TranslationPipeline::new(
            Arc::clone(&self.backends.translator),
            editor,
            self.config.deepl.glossary_name.clone(),
        )
    }

    pub fn fiche_generator(&self) -> FicheGenerator {
        FicheGenerator::new(Arc::clone(&self.backends.chat), self.config.llm.clone())
    }

    /// Forget jobs older than [`JOB_MAX_AGE`]. Returns how many were removed.
    pub async fn cleanup_old_jobs(&self) -> usize {
        self.cleanup_jobs_older_than(JOB_MAX_AGE).await
    }

    async fn cleanup_jobs_older_than(&self, max_age: Duration) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        let now = Instant::now();
        jobs.retain(|_, job| now.duration_since(job.created_at) < max_age);
        let removed = before - jobs.len();

        let mut latest = self.latest.write().await;
        if latest.is_some_and(|id| !jobs.contains_key(&id)) {
            *latest = None;
        }
        removed
    }
}
