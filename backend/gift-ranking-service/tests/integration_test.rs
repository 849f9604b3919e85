use async_trait::async_trait;
use chrono::Utc;
use gift_ranking_service::{
    models::{
        CandidateProduct, CatalogProduct, InteractionAction, InteractionRecord,
        RecommendationRequest, SessionConstraints, SessionProfile,
    },
    services::NicheAnalyzer,
    store::{
        CandidateFilter, CatalogStore, InMemoryCatalog, InMemoryInteractions, InteractionStore,
        StoreError, StoreResult,
    },
    EngineConfig, EngineError, MokaPreferenceCache, PreferenceCache, RecommendationEngine,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const CATEGORIES: [&str; 5] = ["Books", "Electronics", "Garden", "Kitchen", "Toys"];
const RETAILERS: [&str; 3] = ["amazon", "ebay", "vendor"];

fn product(i: usize) -> CandidateProduct {
    CandidateProduct {
        product: CatalogProduct {
            id: format!("p{:03}", i),
            title: format!("Gift {}", i),
            price: 5.0 + (i % 20) as f64 * 5.0,
            categories: vec![CATEGORIES[i % CATEGORIES.len()].to_string()],
            retailer: RETAILERS[i % RETAILERS.len()].to_string(),
            brand: None,
            quality_score: (i * 37 % 100) as f64,
            popularity_score: (i * 53 % 100) as f64,
            rating: 3.0 + (i % 3) as f64 * 0.5,
            recency_score: if i % 7 == 0 { 0.95 } else { 0.3 },
            target_age_groups: Vec::new(),
            embedding: Some(vec![(i % 5) as f32 + 1.0, (i % 3) as f32, 1.0]),
            created_at: Utc::now(),
        },
        similarity: 0.0,
        is_vendor: i % 3 == 2,
        is_sponsored: false,
    }
}

fn catalog(n: usize) -> InMemoryCatalog {
    InMemoryCatalog::new((0..n).map(product).collect())
}

fn cache() -> Arc<dyn PreferenceCache> {
    Arc::new(MokaPreferenceCache::new(100, Duration::from_secs(60)))
}

fn engine_with(catalog: InMemoryCatalog, interactions: InMemoryInteractions) -> RecommendationEngine {
    RecommendationEngine::new(
        EngineConfig::default(),
        Arc::new(catalog),
        Arc::new(interactions),
        cache(),
    )
    .expect("engine should build with default config")
}

fn request(session_id: &str, page: i64, page_size: i64) -> RecommendationRequest {
    RecommendationRequest {
        session: SessionProfile {
            session_id: session_id.to_string(),
            embedding: None,
            constraints: SessionConstraints::default(),
        },
        page,
        page_size: Some(page_size),
    }
}

fn book_lover() -> InMemoryInteractions {
    let interactions = InMemoryInteractions::new();
    for (i, price) in [10.0, 30.0, 50.0].iter().enumerate() {
        interactions.record(
            "book-lover",
            InteractionRecord {
                product_id: format!("hist-{}", i),
                action: InteractionAction::Like,
                categories: vec!["Books".to_string()],
                price: *price,
                brand: None,
            },
        );
    }
    interactions
}

#[tokio::test]
async fn test_repeated_calls_are_deterministic() {
    let engine = engine_with(catalog(120), book_lover());

    let first = engine
        .get_recommendations(request("book-lover", 0, 20))
        .await
        .unwrap();
    let second = engine
        .get_recommendations(request("book-lover", 0, 20))
        .await
        .unwrap();

    let ids = |page: &gift_ranking_service::models::RecommendationPage| {
        page.products
            .iter()
            .map(|p| p.candidate.product.id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.products.len(), 20);
}

#[tokio::test]
async fn test_no_duplicates_and_seen_ids_excluded() {
    let mut products: Vec<CandidateProduct> = (0..60).map(product).collect();
    // Same product listed twice by the store
    products.push(product(3));
    let engine = engine_with(InMemoryCatalog::new(products), InMemoryInteractions::new());

    let mut req = request("anon", 0, 100);
    req.session.constraints.seen_ids = vec!["p000".to_string(), "p001".to_string()];

    let page = engine.get_recommendations(req).await.unwrap();

    let ids: Vec<&str> = page
        .products
        .iter()
        .map(|p| p.candidate.product.id.as_str())
        .collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
    assert!(!unique.contains("p000"));
    assert!(!unique.contains("p001"));
}

#[tokio::test]
async fn test_diversified_list_is_capped() {
    let engine = engine_with(catalog(400), InMemoryInteractions::new());

    // 3 x 60 = 180 candidates, capped at 100 after diversity
    let first = engine
        .get_recommendations(request("anon", 0, 60))
        .await
        .unwrap();
    let second = engine
        .get_recommendations(request("anon", 1, 60))
        .await
        .unwrap();

    assert_eq!(first.products.len(), 60);
    assert!(first.has_more);
    assert_eq!(second.products.len(), 40);
    assert!(!second.has_more);
}

#[tokio::test]
async fn test_raised_max_results_is_rejected() {
    let mut config = EngineConfig::default();
    config.max_results = 500;

    let result = RecommendationEngine::new(
        config,
        Arc::new(catalog(1000)),
        Arc::new(InMemoryInteractions::new()),
        cache(),
    );
    assert!(matches!(result, Err(EngineError::Config(_))));

    // Largest page size still stops at 100 diversified products
    let engine = engine_with(catalog(1000), InMemoryInteractions::new());
    let first = engine
        .get_recommendations(request("anon", 0, 100))
        .await
        .unwrap();
    let second = engine
        .get_recommendations(request("anon", 1, 100))
        .await
        .unwrap();
    assert_eq!(first.products.len(), 100);
    assert!(!first.has_more);
    assert!(first.products.iter().all(|p| p.rank <= 100));
    assert!(second.products.is_empty());
}

#[tokio::test]
async fn test_pagination_past_end_is_empty() {
    let engine = engine_with(catalog(10), InMemoryInteractions::new());

    let page = engine
        .get_recommendations(request("anon", 5, 20))
        .await
        .unwrap();
    assert!(page.products.is_empty());
    assert!(!page.has_more);
    assert_eq!(page.page, 5);
}

#[tokio::test]
async fn test_preferred_category_rises_to_top() {
    let engine = engine_with(catalog(60), book_lover());

    let page = engine
        .get_recommendations(request("book-lover", 0, 20))
        .await
        .unwrap();

    let top = &page.products[0];
    assert!(top.candidate.product.categories.contains(&"Books".to_string()));
    for window in page.products.windows(2) {
        assert!(window[0].final_score >= window[1].final_score);
    }
}

#[tokio::test]
async fn test_vector_path_with_embedding() {
    let engine = engine_with(catalog(30), InMemoryInteractions::new());

    let mut req = request("anon", 0, 5);
    req.session.embedding = Some(vec![1.0, 0.0, 1.0]);

    let page = engine.get_recommendations(req).await.unwrap();
    assert_eq!(page.products.len(), 5);
    assert!(page
        .products
        .iter()
        .all(|p| (0.0..=1.0 + 1e-9).contains(&p.candidate.similarity)));
}

struct FailingCatalog;

#[async_trait]
impl CatalogStore for FailingCatalog {
    async fn nearest_neighbors(&self, _: &[f32], _: i64) -> StoreResult<Vec<CandidateProduct>> {
        Err(StoreError::Unavailable("vector index offline".to_string()))
    }

    async fn filter_candidates(
        &self,
        _: &CandidateFilter,
        _: i64,
    ) -> StoreResult<Vec<CandidateProduct>> {
        Err(StoreError::Unavailable("catalog offline".to_string()))
    }

    async fn products_in_category(&self, _: &str, _: i64) -> StoreResult<Vec<CatalogProduct>> {
        Err(StoreError::Unavailable("catalog offline".to_string()))
    }
}

struct HangingCatalog;

#[async_trait]
impl CatalogStore for HangingCatalog {
    async fn nearest_neighbors(&self, _: &[f32], _: i64) -> StoreResult<Vec<CandidateProduct>> {
        std::future::pending().await
    }

    async fn filter_candidates(
        &self,
        _: &CandidateFilter,
        _: i64,
    ) -> StoreResult<Vec<CandidateProduct>> {
        std::future::pending().await
    }

    async fn products_in_category(&self, _: &str, _: i64) -> StoreResult<Vec<CatalogProduct>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_failing_catalog_yields_empty_page() {
    let engine = RecommendationEngine::new(
        EngineConfig::default(),
        Arc::new(FailingCatalog),
        Arc::new(book_lover()),
        cache(),
    )
    .unwrap();

    let page = engine
        .get_recommendations(request("book-lover", 0, 20))
        .await
        .unwrap();
    assert_eq!(page.page, 0);
    assert!(!page.has_more);
    assert!(page.products.is_empty());
}

#[tokio::test]
async fn test_hung_catalog_times_out() {
    let mut config = EngineConfig::default();
    config.timeouts.candidate_query_timeout_ms = 20;

    let engine = RecommendationEngine::new(
        config,
        Arc::new(HangingCatalog),
        Arc::new(InMemoryInteractions::new()),
        cache(),
    )
    .unwrap();

    let page = tokio::time::timeout(
        Duration::from_secs(5),
        engine.get_recommendations(request("anon", 0, 20)),
    )
    .await
    .expect("pipeline must not hang")
    .unwrap();
    assert!(page.products.is_empty());
}

struct HangingInteractions;

#[async_trait]
impl InteractionStore for HangingInteractions {
    async fn load_interactions(&self, _: &str) -> StoreResult<Vec<InteractionRecord>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_hung_history_falls_back_to_cold_start() {
    let mut config = EngineConfig::default();
    config.timeouts.profile_load_timeout_ms = 20;

    let hung = RecommendationEngine::new(
        config,
        Arc::new(catalog(60)),
        Arc::new(HangingInteractions),
        cache(),
    )
    .unwrap();
    let cold = engine_with(catalog(60), InMemoryInteractions::new());

    let page = tokio::time::timeout(
        Duration::from_secs(5),
        hung.get_recommendations(request("book-lover", 0, 20)),
    )
    .await
    .expect("profile load must be bounded")
    .unwrap();
    let expected = cold
        .get_recommendations(request("book-lover", 0, 20))
        .await
        .unwrap();

    let ids = |page: &gift_ranking_service::models::RecommendationPage| {
        page.products
            .iter()
            .map(|p| p.candidate.product.id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(page.products.len(), 20);
    assert_eq!(ids(&page), ids(&expected));
}

#[tokio::test]
async fn test_hung_niche_query_times_out() {
    let analyzer = NicheAnalyzer::new(Arc::new(HangingCatalog), Duration::from_millis(20));

    let result = tokio::time::timeout(Duration::from_secs(5), analyzer.profile("Garden"))
        .await
        .expect("niche query must be bounded");

    assert!(matches!(
        result,
        Err(StoreError::Timeout {
            operation: "products_in_category",
            ..
        })
    ));
}

#[tokio::test]
async fn test_niche_profile_from_catalog() {
    let engine = engine_with(catalog(50), InMemoryInteractions::new());

    let niche = engine.niche_analyzer().profile("Garden").await.unwrap();
    assert_eq!(niche.product_count, 10);
    assert!(niche.price_range.is_some());
}

#[tokio::test]
async fn test_update_hook_does_not_fail_for_unknown_session() {
    let engine = engine_with(catalog(5), InMemoryInteractions::new());
    engine
        .update_user_preferences("never-seen", "p001", InteractionAction::Dislike)
        .await;
}
