//! Application configuration for CoursePilot.
//!
//! User config lives at `~/.coursepilot/coursepilot.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoursePilotError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coursepilot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coursepilot";

/// Base URL of the hosted Generative Language API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---------------------------------------------------------------------------
// Config structs (matching coursepilot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Vector database connection.
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Embedding provider used at ingestion and query time.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generative model settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Retrieval defaults.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Prompt template override.
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// `[vector_store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Scheme and host of the Chroma server.
    #[serde(default = "default_store_host")]
    pub host: String,

    /// Chroma server port.
    #[serde(default = "default_store_port")]
    pub port: u16,

    /// Collection holding course documents.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Per-request timeout.
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            host: default_store_host(),
            port: default_store_port(),
            collection: default_collection(),
            timeout_secs: default_store_timeout(),
        }
    }
}

impl VectorStoreConfig {
    /// Base URL of the store, e.g. `http://127.0.0.1:8000`.
    pub fn endpoint(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{}", self.port)
        } else {
            format!("http://{host}:{}", self.port)
        }
    }
}

fn default_store_host() -> String {
    "http://127.0.0.1".into()
}
fn default_store_port() -> u16 {
    8000
}
fn default_collection() -> String {
    "courses".into()
}
fn default_store_timeout() -> u64 {
    30
}

/// Which embedder turns text into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Hosted Gemini embedding model.
    Gemini,
    /// Local feature-hashing embedder (no network, no key).
    Hashing,
}

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,

    /// Embedding model name (Gemini provider).
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector width (hashing provider).
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
        }
    }
}

fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Gemini
}
fn default_embedding_model() -> String {
    "text-embedding-004".into()
}
fn default_embedding_dimensions() -> usize {
    768
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Hosted model answering recommendation prompts.
    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout; generation is slow, keep this generous.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_generation_model(),
            base_url: default_base_url(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_generation_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_base_url() -> String {
    GEMINI_BASE_URL.into()
}
fn default_generation_timeout() -> u64 {
    120
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of candidate courses retrieved per request.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

/// `[prompt]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Path to a template file replacing the bundled one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coursepilot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CoursePilotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.coursepilot/coursepilot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CoursePilotError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CoursePilotError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CoursePilotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CoursePilotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CoursePilotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values no request could succeed with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.vector_store.collection.trim().is_empty() {
        return Err(CoursePilotError::config("vector_store.collection must not be empty"));
    }
    if config.retrieval.top_k == 0 {
        return Err(CoursePilotError::config("retrieval.top_k must be at least 1"));
    }
    if config.embedding.provider == EmbeddingProvider::Hashing && config.embedding.dimensions == 0
    {
        return Err(CoursePilotError::config("embedding.dimensions must be at least 1"));
    }
    Ok(())
}

/// Read the API key from the env var named `var_name`.
pub fn read_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(CoursePilotError::config(format!(
            "API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/app/apikey"
        ))),
    }
}
