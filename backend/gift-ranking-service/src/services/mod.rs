pub mod diversity;
pub mod ingestion;
pub mod niche;
pub mod pagination;
pub mod preferences;
pub mod retrieval;
pub mod scoring;

pub use diversity::DiversityLayer;
pub use ingestion::{DedupStats, IngestedProduct, ProductDeduplicator, ProductSource};
pub use niche::{NicheAnalyzer, NicheBooster};
pub use pagination::paginate;
pub use preferences::{
    CacheError, MokaPreferenceCache, PreferenceCache, PreferenceLoader, RedisPreferenceCache,
};
pub use retrieval::{CandidateRetriever, RetrievalStrategy};
pub use scoring::{HybridScorer, ScoringContext, ScoringStrategy};
