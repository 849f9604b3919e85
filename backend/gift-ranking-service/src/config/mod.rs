use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Hard ceiling on the diversified list, whatever `max_results` says.
pub const MAX_RESULTS_CAP: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Weight {name} must be within [0, 1], got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub timeouts: TimeoutConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub preference_cache_backend: CacheBackend,
    #[serde(default = "default_cache_capacity")]
    pub preference_cache_capacity: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub preference_cache_ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.preference_cache_ttl_secs)
    }
}

/// Upper bounds on every data-layer call.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_profile_timeout_ms")]
    pub profile_load_timeout_ms: u64,
    #[serde(default = "default_candidate_timeout_ms")]
    pub candidate_query_timeout_ms: u64,
}

impl TimeoutConfig {
    pub fn profile_load(&self) -> Duration {
        Duration::from_millis(self.profile_load_timeout_ms)
    }

    pub fn candidate_query(&self) -> Duration {
        Duration::from_millis(self.candidate_query_timeout_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            profile_load_timeout_ms: default_profile_timeout_ms(),
            candidate_query_timeout_ms: default_candidate_timeout_ms(),
        }
    }
}

/// Stage weights of the hybrid scorer.
#[derive(Debug, Clone, Deserialize)]
pub struct HybridWeights {
    pub collaborative_weight: f64,
    pub content_weight: f64,
    pub deep_weight: f64,
    pub demographic_weight: f64,
    /// Opt-in dislike penalty; 0 keeps the strategy unregistered
    pub dislike_weight: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            collaborative_weight: 0.3,
            content_weight: 0.4,
            deep_weight: 0.2,
            demographic_weight: 0.1,
            dislike_weight: 0.0,
        }
    }
}

/// Weights inside the content-based signal.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentWeights {
    pub category_weight: f64,
    pub price_weight: f64,
    pub rating_weight: f64,
    pub embedding_weight: f64,
}

impl Default for ContentWeights {
    fn default() -> Self {
        Self {
            category_weight: 0.4,
            price_weight: 0.2,
            rating_weight: 0.2,
            embedding_weight: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub hybrid: HybridWeights,
    pub content_based: ContentWeights,
    pub deep_learning_enabled: bool,
    pub niche_threshold: f64,
    pub niche_bonus: f64,
    pub diversity_boost: f64,
    pub novelty_boost: f64,
    pub novelty_recency_threshold: f64,
    pub max_results: usize,
    pub default_page_size: i64,
    pub candidate_multiplier: i64,
    /// Divide the blended score by the sum of registered stage weights
    pub renormalize_weights: bool,
    pub timeouts: TimeoutConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hybrid: HybridWeights::default(),
            content_based: ContentWeights::default(),
            deep_learning_enabled: false,
            niche_threshold: 0.7,
            niche_bonus: 0.7,
            diversity_boost: 0.1,
            novelty_boost: 0.05,
            novelty_recency_threshold: 0.8,
            max_results: 100,
            default_page_size: 20,
            candidate_multiplier: 3,
            renormalize_weights: false,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Every weight and boost must sit in [0, 1]. Sums are deliberately not checked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("collaborative_weight", self.hybrid.collaborative_weight),
            ("content_weight", self.hybrid.content_weight),
            ("deep_weight", self.hybrid.deep_weight),
            ("demographic_weight", self.hybrid.demographic_weight),
            ("dislike_weight", self.hybrid.dislike_weight),
            ("category_weight", self.content_based.category_weight),
            ("price_weight", self.content_based.price_weight),
            ("rating_weight", self.content_based.rating_weight),
            ("embedding_weight", self.content_based.embedding_weight),
            ("niche_threshold", self.niche_threshold),
            ("niche_bonus", self.niche_bonus),
            ("diversity_boost", self.diversity_boost),
            ("novelty_boost", self.novelty_boost),
            ("novelty_recency_threshold", self.novelty_recency_threshold),
        ];

        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        if self.max_results == 0 || self.max_results > MAX_RESULTS_CAP {
            return Err(ConfigError::Invalid(format!(
                "max_results must be within 1..={}, got {}",
                MAX_RESULTS_CAP, self.max_results
            )));
        }
        if self.default_page_size <= 0 {
            return Err(ConfigError::Invalid(
                "default_page_size must be > 0".to_string(),
            ));
        }
        if self.candidate_multiplier <= 0 {
            return Err(ConfigError::Invalid(
                "candidate_multiplier must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Flat `RANKING_*` view of [`EngineConfig`] as envy sees it. Unset
/// variables fall back to [`EngineConfig::default`].
#[derive(Debug, Deserialize)]
#[serde(default)]
struct EngineEnv {
    collaborative_weight: f64,
    content_weight: f64,
    deep_weight: f64,
    demographic_weight: f64,
    dislike_weight: f64,
    category_weight: f64,
    price_weight: f64,
    rating_weight: f64,
    embedding_weight: f64,
    deep_learning_enabled: bool,
    niche_threshold: f64,
    niche_bonus: f64,
    diversity_boost: f64,
    novelty_boost: f64,
    novelty_recency_threshold: f64,
    max_results: usize,
    default_page_size: i64,
    candidate_multiplier: i64,
    renormalize_weights: bool,
}

impl Default for EngineEnv {
    fn default() -> Self {
        let d = EngineConfig::default();
        Self {
            collaborative_weight: d.hybrid.collaborative_weight,
            content_weight: d.hybrid.content_weight,
            deep_weight: d.hybrid.deep_weight,
            demographic_weight: d.hybrid.demographic_weight,
            dislike_weight: d.hybrid.dislike_weight,
            category_weight: d.content_based.category_weight,
            price_weight: d.content_based.price_weight,
            rating_weight: d.content_based.rating_weight,
            embedding_weight: d.content_based.embedding_weight,
            deep_learning_enabled: d.deep_learning_enabled,
            niche_threshold: d.niche_threshold,
            niche_bonus: d.niche_bonus,
            diversity_boost: d.diversity_boost,
            novelty_boost: d.novelty_boost,
            novelty_recency_threshold: d.novelty_recency_threshold,
            max_results: d.max_results,
            default_page_size: d.default_page_size,
            candidate_multiplier: d.candidate_multiplier,
            renormalize_weights: d.renormalize_weights,
        }
    }
}

impl EngineEnv {
    fn into_config(self, timeouts: TimeoutConfig) -> EngineConfig {
        EngineConfig {
            hybrid: HybridWeights {
                collaborative_weight: self.collaborative_weight,
                content_weight: self.content_weight,
                deep_weight: self.deep_weight,
                demographic_weight: self.demographic_weight,
                dislike_weight: self.dislike_weight,
            },
            content_based: ContentWeights {
                category_weight: self.category_weight,
                price_weight: self.price_weight,
                rating_weight: self.rating_weight,
                embedding_weight: self.embedding_weight,
            },
            deep_learning_enabled: self.deep_learning_enabled,
            niche_threshold: self.niche_threshold,
            niche_bonus: self.niche_bonus,
            diversity_boost: self.diversity_boost,
            novelty_boost: self.novelty_boost,
            novelty_recency_threshold: self.novelty_recency_threshold,
            max_results: self.max_results,
            default_page_size: self.default_page_size,
            candidate_multiplier: self.candidate_multiplier,
            renormalize_weights: self.renormalize_weights,
            timeouts,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let timeouts: TimeoutConfig = envy::from_env()?;
        let engine = envy::prefixed("RANKING_")
            .from_env::<EngineEnv>()?
            .into_config(timeouts.clone());
        engine.validate()?;

        Ok(Config {
            service: envy::from_env()?,
            database: envy::from_env()?,
            redis: envy::from_env()?,
            cache: envy::from_env()?,
            timeouts,
            engine,
        })
    }
}

fn default_service_name() -> String {
    "gift-ranking-service".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/giftwise".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    1800
}

fn default_profile_timeout_ms() -> u64 {
    2000
}

fn default_candidate_timeout_ms() -> u64 {
    3000
}
