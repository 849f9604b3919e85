use crate::models::{CandidateProduct, SessionProfile};
use crate::store::{with_timeout, CandidateFilter, CatalogStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStrategy {
    /// Nearest neighbours of the session embedding
    Vector,
    /// Status / price / category filter
    Attribute,
}

impl RetrievalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalStrategy::Vector => "vector",
            RetrievalStrategy::Attribute => "attribute",
        }
    }

    pub fn for_session(session: &SessionProfile) -> Self {
        match &session.embedding {
            Some(embedding) if !embedding.is_empty() => RetrievalStrategy::Vector,
            _ => RetrievalStrategy::Attribute,
        }
    }
}

/// Candidate Retriever - 候選集召回
///
/// Failures never propagate: a broken or slow catalog yields an empty
/// candidate list and the pipeline renders an empty page.
pub struct CandidateRetriever {
    catalog: Arc<dyn CatalogStore>,
    timeout: Duration,
}

impl CandidateRetriever {
    pub fn new(catalog: Arc<dyn CatalogStore>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    pub async fn retrieve(&self, session: &SessionProfile, limit: i64) -> Vec<CandidateProduct> {
        let strategy = RetrievalStrategy::for_session(session);

        let result = match (strategy, session.embedding.as_deref()) {
            (RetrievalStrategy::Vector, Some(embedding)) => {
                with_timeout(
                    "nearest_neighbors",
                    self.timeout,
                    self.catalog.nearest_neighbors(embedding, limit),
                )
                .await
            }
            _ => {
                let filter = CandidateFilter {
                    min_price: session.constraints.min_price,
                    max_price: session.constraints.max_price,
                    categories: session.constraints.interests.clone(),
                };
                with_timeout(
                    "filter_candidates",
                    self.timeout,
                    self.catalog.filter_candidates(&filter, limit),
                )
                .await
            }
        };

        match result {
            Ok(candidates) => {
                info!(
                    session_id = %session.session_id,
                    strategy = strategy.as_str(),
                    count = candidates.len(),
                    limit,
                    "Candidate retrieval complete"
                );
                candidates
            }
            Err(e) => {
                warn!(
                    session_id = %session.session_id,
                    strategy = strategy.as_str(),
                    error = %e,
                    "Candidate retrieval failed, continuing with no candidates"
                );
                Vec::new()
            }
        }
    }
}
