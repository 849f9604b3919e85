pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::{Config, EngineConfig};
pub use engine::RecommendationEngine;
pub use error::EngineError;
pub use services::{DiversityLayer, HybridScorer, MokaPreferenceCache, PreferenceCache};
