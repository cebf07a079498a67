use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::embeddings::{CachedEmbedder, EmbeddingModel, HashingEmbedder};
use crate::error::QaError;
use crate::routing::fuzzy::DEFAULT_FUZZY_THRESHOLD;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub router: RouterConfig,
    pub evaluation: EvaluationConfig,
    pub embedding: EmbeddingConfig,
}

/// Which routing strategy `build_router` constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterStrategy {
    Keyword,
    Semantic,
    Llm,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub strategy: RouterStrategy,
    /// Fuzzy threshold for HR and Sales keyword lists
    pub domain_fuzzy_threshold: f64,
    /// Fuzzy threshold for the policy list; stricter because false positives cost more
    pub policy_fuzzy_threshold: f64,
    pub keyword_confidence: f32,
    pub policy_confidence: f32,
    pub ambiguous_confidence: f32,
    pub default_confidence: f32,
    /// Decisions below this confidence on short queries get a clarification prompt
    pub clarification_confidence: f32,
    /// Hybrid strategy trusts keywords only with at least this many distinct hits
    pub min_keyword_hits: usize,
    /// Semantic strategy falls back to the default route below this cosine
    pub min_semantic_similarity: f32,
    pub llm_max_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Semantic threshold for non-KPI routes when a test case sets none
    pub default_semantic_threshold: f64,
    /// Relative tolerance when checking numbers against ground truth
    pub ground_truth_tolerance: f64,
    /// Worker threads for suite runs (0 = rayon default)
    pub parallelism: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub cache_size: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: RouterStrategy::Keyword,
            domain_fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            policy_fuzzy_threshold: 0.75,
            keyword_confidence: 0.95,
            policy_confidence: 0.9,
            ambiguous_confidence: 0.6,
            default_confidence: 0.5,
            clarification_confidence: 0.7,
            min_keyword_hits: 2,
            min_semantic_similarity: 0.3,
            llm_max_tokens: 60,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            default_semantic_threshold: 0.75,
            ground_truth_tolerance: 0.05,
            parallelism: 0,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 256,
            cache_size: 1000,
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            evaluation: EvaluationConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    /// The offline hashing embedder at `dimension`, behind an LRU cache of
    /// `cache_size` entries.
    pub fn build(&self) -> Arc<dyn EmbeddingModel> {
        let inner: Arc<dyn EmbeddingModel> = Arc::new(HashingEmbedder::new(self.dimension));
        Arc::new(CachedEmbedder::new(inner, self.cache_size))
    }
}

impl AssistantConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), QaError> {
        let r = &self.router;
        for (name, value) in [
            ("router.domain_fuzzy_threshold", r.domain_fuzzy_threshold),
            ("router.policy_fuzzy_threshold", r.policy_fuzzy_threshold),
            (
                "evaluation.default_semantic_threshold",
                self.evaluation.default_semantic_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(QaError::Config(format!("{} must be in [0.0, 1.0]", name)));
            }
        }
        for (name, value) in [
            ("router.keyword_confidence", r.keyword_confidence),
            ("router.policy_confidence", r.policy_confidence),
            ("router.ambiguous_confidence", r.ambiguous_confidence),
            ("router.default_confidence", r.default_confidence),
            ("router.clarification_confidence", r.clarification_confidence),
            ("router.min_semantic_similarity", r.min_semantic_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(QaError::Config(format!("{} must be in [0.0, 1.0]", name)));
            }
        }
        if r.min_keyword_hits == 0 {
            return Err(QaError::Config("router.min_keyword_hits must be > 0".into()));
        }
        if r.llm_max_tokens == 0 {
            return Err(QaError::Config("router.llm_max_tokens must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.evaluation.ground_truth_tolerance) {
            return Err(QaError::Config(
                "evaluation.ground_truth_tolerance must be in [0.0, 1.0)".into(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(QaError::Config("embedding.dimension must be > 0".into()));
        }
        if self.embedding.cache_size == 0 {
            return Err(QaError::Config("embedding.cache_size must be > 0".into()));
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, QaError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), strategy = ?config.router.strategy, "[Config] Loaded");
        Ok(config)
    }

    /// Conventional location: `<config dir>/retail-qa/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retail-qa")
            .join("config.json")
    }

    /// Load from `default_path()` when it exists, otherwise use defaults.
    pub fn load_or_default() -> Result<Self, QaError> {
        let path = Self::default_path();
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}
