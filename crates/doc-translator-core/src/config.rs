use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Language code as understood by DeepL ("EN", "FR", "EN-GB", ...).
///
/// Codes are stored as given; `deepl_code` normalises to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-cased code as sent to the DeepL API.
    pub fn deepl_code(&self) -> String {
        self.0.trim().to_uppercase()
    }

    /// Case-insensitive comparison ("fr" == "FR").
    pub fn is_same(&self, other: &Self) -> bool {
        self.0.trim().eq_ignore_ascii_case(other.0.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// DeepL document API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeeplConfig {
    #[serde(default = "default_deepl_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Delay between two status checks of a document job
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on how long a document job may stay unfinished
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Name given to glossaries created for a job
    #[serde(default = "default_glossary_name")]
    pub glossary_name: String,
}

fn default_deepl_api_base() -> String {
    "https://api.deepl.com/v2".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    2000
}

const fn default_max_wait_secs() -> u64 {
    1800
}

fn default_glossary_name() -> String {
    "MyGlossary".to_string()
}

impl DeeplConfig {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            ..Default::default()
        }
    }
}

impl Default for DeeplConfig {
    fn default() -> Self {
        Self {
            api_base: default_deepl_api_base(),
            api_key: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
            glossary_name: default_glossary_name(),
        }
    }
}

/// Chat-completion backend configuration (OpenAI-compatible APIs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Wait applied on HTTP 429 when the server sends no Retry-After
    #[serde(default = "default_rate_limit_delay_secs")]
    pub rate_limit_delay_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

const fn default_rate_limit_delay_secs() -> u64 {
    15
}

const fn default_timeout_secs() -> u64 {
    120
}

impl LlmConfig {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            ..Default::default()
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_llm_api_base(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            rate_limit_delay_secs: default_rate_limit_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Defaults for the post-editing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEditConfig {
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    #[serde(default = "default_language_level")]
    pub language_level: String,
}

const fn default_group_size() -> usize {
    3
}

fn default_language_level() -> String {
    "standard".to_string()
}

impl Default for PostEditConfig {
    fn default() -> Self {
        Self {
            group_size: default_group_size(),
            language_level: default_language_level(),
        }
    }
}

/// Working directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// History database location (defaults to the XDG data directory)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

impl PathsConfig {
    /// Directory holding generated fiche PDFs.
    pub fn marketing_dir(&self) -> PathBuf {
        self.download_dir.join("marketing")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(crate::util::default_data_path)
            .join("history")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            download_dir: default_download_dir(),
            data_dir: None,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable memory cache
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Memory cache budget in megabytes
    #[serde(default = "default_memory_max_mb")]
    pub memory_max_mb: u64,

    /// Memory cache TTL in seconds (0 = no expiry)
    #[serde(default)]
    pub memory_ttl_seconds: u64,

    /// Enable disk cache
    #[serde(default = "default_true")]
    pub disk_enabled: bool,

    /// Disk cache directory (defaults to .cache/doc-translator)
    #[serde(default)]
    pub disk_path: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

const fn default_memory_max_mb() -> u64 {
    64
}

impl CacheConfig {
    /// Configuration with both layers switched off.
    pub fn disabled() -> Self {
        Self {
            memory_enabled: false,
            disk_enabled: false,
            ..Default::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            memory_max_mb: default_memory_max_mb(),
            memory_ttl_seconds: 0,
            disk_enabled: true,
            disk_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub deepl: DeeplConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub post_edit: PostEditConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Environment variable prefix for layered configuration.
pub const ENV_PREFIX: &str = "DOC_TRANSLATOR";

impl AppConfig {
    /// Load configuration from a single TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Layered load: defaults, user config, ./config.toml, then
    /// `DOC_TRANSLATOR__SECTION__KEY` environment variables.
    pub fn load() -> Self {
        match Self::load_layered(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Same as [`AppConfig::load`] with an explicit file added on top of the
    /// default locations. Errors are returned instead of swallowed.
    pub fn load_layered(extra: Option<&Path>) -> Result<Self> {
        Self::layered(extra, None)
    }

    /// `env` replaces the process environment when given.
    fn layered(extra: Option<&Path>, env: Option<::config::Map<String, String>>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Self::default())
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;

        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("doc-translator").join("config.toml");
            tracing::debug!("Looking for config at {}", user_config.display());
            builder = builder.add_source(::config::File::from(user_config).required(false));
        }

        builder = builder.add_source(::config::File::from(PathBuf::from("config.toml")).required(false));

        if let Some(path) = extra {
            builder = builder.add_source(::config::File::from(path.to_path_buf()).required(true));
        }

        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(env),
            )
            .build()
            .and_then(::config::Config::try_deserialize)
            .map_err(|e| Error::ConfigLoad(e.to_string()))
    }
}

/// A language option for client dropdowns
#[derive(Debug, Clone, Serialize)]
pub struct LanguageOption {
    /// DeepL language code (e.g., "EN", "FR", "EN-GB")
    pub code: &'static str,
    /// Display name (e.g., "English", "French")
    pub name: &'static str,
}

/// Languages DeepL accepts as document source.
pub fn source_languages() -> Vec<LanguageOption> {
    vec![
        LanguageOption { code: "FR", name: "French" },
        LanguageOption { code: "EN", name: "English" },
        LanguageOption { code: "DE", name: "German" },
        LanguageOption { code: "ES", name: "Spanish" },
        LanguageOption { code: "IT", name: "Italian" },
        LanguageOption { code: "NL", name: "Dutch" },
        LanguageOption { code: "PT", name: "Portuguese" },
        LanguageOption { code: "JA", name: "Japanese" },
        LanguageOption { code: "ZH", name: "Chinese" },
    ]
}

/// Languages offered as translation target (regional variants where DeepL requires them).
pub fn target_languages() -> Vec<LanguageOption> {
    vec![
        LanguageOption { code: "EN-GB", name: "English (British)" },
        LanguageOption { code: "EN-US", name: "English (American)" },
        LanguageOption { code: "FR", name: "French" },
        LanguageOption { code: "DE", name: "German" },
        LanguageOption { code: "ES", name: "Spanish" },
        LanguageOption { code: "IT", name: "Italian" },
        LanguageOption { code: "NL", name: "Dutch" },
        LanguageOption { code: "PT-PT", name: "Portuguese" },
        LanguageOption { code: "PT-BR", name: "Portuguese (Brazilian)" },
    ]
}

/// Chat models offered for post-editing.
pub fn supported_models() -> Vec<&'static str> {
    vec!["gpt-3.5-turbo", "gpt-4", "gpt-4o", "gpt-4o-mini"]
}

/// Registers offered for the post-editing prompt.
pub fn language_levels() -> Vec<&'static str> {
    vec!["standard", "soutenu", "familier", "technical", "marketing"]
}

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// Default output file name for improved translations
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "improved_output.docx";

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_deepl_code_uppercases() {
        assert_eq!(Lang::new(" en-gb ").deepl_code(), "EN-GB");
        assert!(Lang::new("fr").is_same(&Lang::new("FR")));
        assert!(!Lang::new("fr").is_same(&Lang::new("EN")));
    }

    #[test]
    fn test_defaults_match_original_prompt_settings() {
        let config = AppConfig::default();
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.max_tokens, 2048);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.llm.rate_limit_delay_secs, 15);
        assert_eq!(config.deepl.glossary_name, "MyGlossary");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [llm]
            model = "gpt-4"

            [paths]
            download_dir = "/srv/out"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.llm.retry_count, 3);
        assert_eq!(config.paths.download_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.paths.marketing_dir(), PathBuf::from("/srv/out/marketing"));
        assert_eq!(config.deepl.api_base, "https://api.deepl.com/v2");
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let result = AppConfig::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(Error::ConfigLoad(_))));
    }

    #[test]
    fn test_load_layered_with_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[post_edit]\ngroup_size = 7\n").unwrap();

        let config = AppConfig::load_layered(Some(&path)).unwrap();
        assert_eq!(config.post_edit.group_size, 7);
        assert_eq!(config.post_edit.language_level, "standard");
    }

    #[test]
    fn test_environment_overrides_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[post_edit]\ngroup_size = 7\n\n[llm]\nmodel = \"gpt-4\"\n").unwrap();

        let env = ::config::Map::from([(
            "DOC_TRANSLATOR__POST_EDIT__GROUP_SIZE".to_string(),
            "9".to_string(),
        )]);
        let config = AppConfig::layered(Some(&path), Some(env)).unwrap();
        assert_eq!(config.post_edit.group_size, 9);
        assert_eq!(config.llm.model, "gpt-4");
    }
}
