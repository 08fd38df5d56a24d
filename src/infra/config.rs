// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::errors::DossierError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub fast: FastConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub parallel: ParallelConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub corpus: CorpusConfig,
}

/// Model id per pipeline stage. Cheap models carry the high-volume stages,
/// the report gets the strongest one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub query_generation: String,
    pub relevance: String,
    pub analysis: String,
    pub reflection: String,
    pub report: String,
    /// Model used when a prompt exceeds `llm.fallback_token_limit`.
    pub fallback: String,
    /// Model-id prefixes exempt from the token-ceiling fallback.
    #[serde(default = "default_large_context")]
    pub large_context: Vec<String>,
}

fn default_large_context() -> Vec<String> {
    vec!["google/gemini-2.5".into()]
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            query_generation: "google/gemini-2.5-flash-lite".into(),
            relevance: "google/gemini-2.5-flash-lite".into(),
            analysis: "google/gemini-2.5-flash".into(),
            reflection: "google/gemini-2.5-flash".into(),
            report: "google/gemini-2.5-pro".into(),
            fallback: "google/gemini-2.5-flash".into(),
            large_context: default_large_context(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound on queries requested per iteration.
    pub max_queries: usize,
    /// Ranked passages retrieved per query.
    pub search_limit: usize,
    /// Auto-expansion cap for hybrid search result groups.
    pub auto_limit: usize,
    pub max_iterations: u32,
    /// When false, a run converges right after its first analysis pass.
    pub iterative: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_queries: 5,
            search_limit: 30,
            auto_limit: 5,
            max_iterations: 3,
            iterative: false,
        }
    }
}

/// `--fast` collapses every stage onto one cheap model with tighter limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastConfig {
    pub model: String,
    pub max_queries: usize,
    pub search_limit: usize,
    pub auto_limit: usize,
}

impl Default for FastConfig {
    fn default() -> Self {
        Self {
            model: "google/gemini-2.5-flash-lite".into(),
            max_queries: 2,
            search_limit: 10,
            auto_limit: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    /// Environment variable holding the provider API key.
    pub api_key_env: String,
    pub max_output_tokens: u32,
    /// Prompt-token ceiling beyond which `models.fallback` takes over.
    pub fallback_token_limit: u32,
    /// Optional reasoning effort forwarded on the streamed report call.
    pub reasoning_effort: Option<String>,
    /// Abort the report stream when no chunk arrives for this long.
    pub stream_idle_timeout_secs: u64,
    #[serde(default)]
    pub temperature: TemperatureConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".into(),
            api_key_env: "OPENROUTER_API_KEY".into(),
            max_output_tokens: 8192,
            fallback_token_limit: 200_000,
            reasoning_effort: None,
            stream_idle_timeout_secs: 120,
            temperature: TemperatureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureConfig {
    pub low: f32,
    pub base: f32,
    pub high: f32,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            low: 0.1,
            base: 0.4,
            high: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 30_000,
            jitter_fraction: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Worker-pool width for batched relevance and analysis calls.
    pub max_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self { max_workers: 8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the hybrid search index.
    pub url: String,
    pub collection: String,
    /// OpenAI-compatible embeddings endpoint.
    pub embeddings_url: String,
    pub embeddings_model: String,
    /// Environment variable with the embeddings API key, if the endpoint needs one.
    pub embeddings_api_key_env: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".into(),
            collection: "Passages".into(),
            embeddings_url: "http://localhost:8081/v1".into(),
            embeddings_model: "multilingual-e5-large".into(),
            embeddings_api_key_env: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// JSON file with the full documents the passages were chunked from.
    pub path: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: "corpus.json".into(),
        }
    }
}

/// Per-stage model ids resolved for one run.
#[derive(Debug, Clone)]
pub struct StageModels {
    pub query_generation: String,
    pub relevance: String,
    pub analysis: String,
    pub reflection: String,
    pub report: String,
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the model for each stage; `--fast` collapses all roles.
    pub fn stage_models(&self, fast: bool) -> StageModels {
        if fast {
            let m = self.fast.model.clone();
            return StageModels {
                query_generation: m.clone(),
                relevance: m.clone(),
                analysis: m.clone(),
                reflection: m.clone(),
                report: m,
            };
        }
        StageModels {
            query_generation: self.models.query_generation.clone(),
            relevance: self.models.relevance.clone(),
            analysis: self.models.analysis.clone(),
            reflection: self.models.reflection.clone(),
            report: self.models.report.clone(),
        }
    }

    /// Workflow limits, tightened under `--fast`.
    pub fn workflow_limits(&self, fast: bool) -> WorkflowConfig {
        if fast {
            return WorkflowConfig {
                max_queries: self.fast.max_queries,
                search_limit: self.fast.search_limit,
                auto_limit: self.fast.auto_limit,
                ..self.workflow.clone()
            };
        }
        self.workflow.clone()
    }

    /// Read the provider API key from the configured environment variable.
    /// Missing credentials are fatal before any iteration starts.
    pub fn api_key(&self) -> Result<String, DossierError> {
        std::env::var(&self.llm.api_key_env).map_err(|_| {
            DossierError::Config(format!(
                "missing API key: set the {} environment variable",
                self.llm.api_key_env
            ))
        })
    }
}
