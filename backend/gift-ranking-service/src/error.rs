use crate::config::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that escape `RecommendationEngine::get_recommendations`.
///
/// Store and cache failures are recovered inside their stages and never
/// show up here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
