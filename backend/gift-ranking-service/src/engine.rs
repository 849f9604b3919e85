//! Recommendation pipeline.
//!
//! Loader → Retriever → Scorer → Niche Booster → Diversity → Paginator.
//! Each stage runs once per request, sequentially, over the previous stage's
//! output. Stage 1 and 2 failures degrade (cold start / no candidates);
//! only argument errors escape.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{InteractionAction, RecommendationPage, RecommendationRequest};
use crate::services::{
    paginate, CandidateRetriever, DiversityLayer, HybridScorer, NicheAnalyzer, NicheBooster,
    PreferenceCache, PreferenceLoader, ScoringContext,
};
use crate::store::{CatalogStore, InteractionStore};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub struct RecommendationEngine {
    config: EngineConfig,
    loader: PreferenceLoader,
    retriever: CandidateRetriever,
    scorer: HybridScorer,
    niche: NicheBooster,
    diversity: DiversityLayer,
    catalog: Arc<dyn CatalogStore>,
}

impl RecommendationEngine {
    pub fn new(
        config: EngineConfig,
        catalog: Arc<dyn CatalogStore>,
        interactions: Arc<dyn InteractionStore>,
        cache: Arc<dyn PreferenceCache>,
    ) -> Result<Self> {
        config.validate()?;

        let loader = PreferenceLoader::new(interactions, cache, config.timeouts.profile_load());
        let retriever = CandidateRetriever::new(catalog.clone(), config.timeouts.candidate_query());
        let scorer = HybridScorer::from_config(&config);
        let niche = NicheBooster::new(config.niche_threshold, config.niche_bonus);
        let diversity = DiversityLayer::new(config.diversity_boost, config.novelty_boost)
            .with_novelty_threshold(config.novelty_recency_threshold)
            .with_max_results(config.max_results);

        info!(
            strategies = ?scorer.strategy_names(),
            renormalize = config.renormalize_weights,
            "Recommendation engine initialized"
        );

        Ok(Self {
            config,
            loader,
            retriever,
            scorer,
            niche,
            diversity,
            catalog,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Catalog aggregation for one category cluster.
    pub fn niche_analyzer(&self) -> NicheAnalyzer {
        NicheAnalyzer::new(self.catalog.clone(), self.config.timeouts.candidate_query())
    }

    pub async fn get_recommendations(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationPage> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "get_recommendations",
            %request_id,
            session_id = %request.session.session_id,
            page = request.page,
        );

        self.run_pipeline(request).instrument(span).await
    }

    async fn run_pipeline(&self, request: RecommendationRequest) -> Result<RecommendationPage> {
        let page = request.page;
        let page_size = request.page_size.unwrap_or(self.config.default_page_size);

        if page < 0 {
            return Err(EngineError::InvalidArgument(format!(
                "page must be >= 0, got {}",
                page
            )));
        }
        if page_size <= 0 {
            return Err(EngineError::InvalidArgument(format!(
                "page_size must be > 0, got {}",
                page_size
            )));
        }

        let session = &request.session;
        let limit = page_size
            .checked_mul(self.config.candidate_multiplier)
            .ok_or_else(|| {
                EngineError::InvalidArgument(format!("page_size {} is too large", page_size))
            })?;

        // 1. Preference profile (None = cold start)
        let preferences = self.loader.load(&session.session_id).await;

        // 2. Candidates
        let candidates = self.retriever.retrieve(session, limit).await;
        if candidates.is_empty() {
            info!(cold_start = preferences.is_none(), "No candidates, returning empty page");
            return Ok(RecommendationPage::empty(page));
        }
        let candidate_count = candidates.len();

        // 3. Multi-signal scoring
        let ctx = ScoringContext {
            session,
            preferences: preferences.as_ref(),
        };
        let mut ranked = self.scorer.rank(&ctx, candidates);

        // 4. Niche boost
        self.niche.apply(&mut ranked, preferences.as_ref());

        // 5. Diversity / novelty
        let diversified = self.diversity.rerank(ranked, &session.constraints.seen_ids);
        let diversified_count = diversified.len();

        // 6. Page
        let result = paginate(diversified, page, page_size)?;

        info!(
            candidates = candidate_count,
            diversified = diversified_count,
            returned = result.products.len(),
            has_more = result.has_more,
            cold_start = preferences.is_none(),
            "Recommendations generated"
        );

        Ok(result)
    }

    /// Fire-and-forget hook after a user interaction. Drops the cached
    /// profile so the next request rebuilds it from history.
    pub async fn update_user_preferences(
        &self,
        session_id: &str,
        product_id: &str,
        action: InteractionAction,
    ) {
        self.loader.invalidate(session_id).await;

        info!(
            session_id = %session_id,
            product_id = %product_id,
            action = action.as_str(),
            "Preference cache invalidated after interaction"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{fixtures, InteractionRecord, SessionConstraints, SessionProfile};
    use crate::services::MokaPreferenceCache;
    use crate::store::{MockCatalogStore, MockInteractionStore, StoreError};
    use std::time::Duration;

    fn cache() -> Arc<dyn PreferenceCache> {
        Arc::new(MokaPreferenceCache::new(100, Duration::from_secs(60)))
    }

    fn request(page: i64, page_size: Option<i64>) -> RecommendationRequest {
        RecommendationRequest {
            session: SessionProfile {
                session_id: "user-1".to_string(),
                embedding: None,
                constraints: SessionConstraints::default(),
            },
            page,
            page_size,
        }
    }

    fn empty_history() -> MockInteractionStore {
        let mut store = MockInteractionStore::new();
        store.expect_load_interactions().returning(|_| Ok(Vec::new()));
        store
    }

    #[tokio::test]
    async fn test_retrieval_failure_returns_empty_page() {
        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_filter_candidates()
            .returning(|_, _| Err(StoreError::Unavailable("db down".to_string())));

        let engine = RecommendationEngine::new(
            EngineConfig::default(),
            Arc::new(catalog),
            Arc::new(empty_history()),
            cache(),
        )
        .unwrap();

        let page = engine.get_recommendations(request(2, None)).await.unwrap();
        assert_eq!(page.page, 2);
        assert!(!page.has_more);
        assert!(page.products.is_empty());
    }

    #[tokio::test]
    async fn test_candidate_limit_is_multiple_of_page_size() {
        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_filter_candidates()
            .withf(|_, limit| *limit == 30)
            .times(1)
            .returning(|_, _| Ok(vec![fixtures::candidate("p1", &["Books"], "amazon", 20.0)]));

        let engine = RecommendationEngine::new(
            EngineConfig::default(),
            Arc::new(catalog),
            Arc::new(empty_history()),
            cache(),
        )
        .unwrap();

        let page = engine.get_recommendations(request(0, Some(10))).await.unwrap();
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].rank, 1);
    }

    #[tokio::test]
    async fn test_negative_page_is_invalid_argument() {
        let engine = RecommendationEngine::new(
            EngineConfig::default(),
            Arc::new(MockCatalogStore::new()),
            Arc::new(MockInteractionStore::new()),
            cache(),
        )
        .unwrap();

        let result = engine.get_recommendations(request(-1, None)).await;
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));

        let result = engine.get_recommendations(request(0, Some(-3))).await;
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.novelty_boost = 2.0;

        let result = RecommendationEngine::new(
            config,
            Arc::new(MockCatalogStore::new()),
            Arc::new(MockInteractionStore::new()),
            cache(),
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_profile() {
        let mut interactions = MockInteractionStore::new();
        interactions.expect_load_interactions().times(2).returning(|_| {
            Ok(vec![InteractionRecord {
                product_id: "liked".to_string(),
                action: InteractionAction::Like,
                categories: vec!["Books".to_string()],
                price: 20.0,
                brand: None,
            }])
        });

        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_filter_candidates()
            .returning(|_, _| Ok(vec![fixtures::candidate("p1", &["Books"], "amazon", 20.0)]));

        let engine = RecommendationEngine::new(
            EngineConfig::default(),
            Arc::new(catalog),
            Arc::new(interactions),
            cache(),
        )
        .unwrap();

        engine.get_recommendations(request(0, None)).await.unwrap();
        engine.get_recommendations(request(0, None)).await.unwrap();
        engine
            .update_user_preferences("user-1", "p1", InteractionAction::Save)
            .await;
        engine.get_recommendations(request(0, None)).await.unwrap();
    }
}
