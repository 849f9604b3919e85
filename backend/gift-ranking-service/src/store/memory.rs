use super::{CandidateFilter, CatalogStore, InteractionStore, StoreError, StoreResult};
use crate::models::{CandidateProduct, CatalogProduct, InteractionRecord};
use crate::utils::similarity_from_distance;
use async_trait::async_trait;
use dashmap::DashMap;
use ndarray::ArrayView1;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

/// JSON fixture used by the CLI `--fixture` mode and the integration tests.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub products: Vec<CandidateProduct>,
    #[serde(default)]
    pub interactions: HashMap<String, Vec<InteractionRecord>>,
}

impl CatalogFixture {
    pub fn from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| StoreError::Unavailable(format!("fixture read failed: {}", e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| StoreError::Unavailable(format!("fixture parse failed: {}", e)))
    }

    pub fn into_stores(self) -> (InMemoryCatalog, InMemoryInteractions) {
        let interactions = InMemoryInteractions::new();
        for (user_id, records) in self.interactions {
            for record in records {
                interactions.record(&user_id, record);
            }
        }
        (InMemoryCatalog::new(self.products), interactions)
    }
}

/// Cosine distance in [0, 2]; `None` for mismatched or zero-length vectors.
fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let norm = (a.dot(&a).sqrt() * b.dot(&b).sqrt()) as f64;
    if norm == 0.0 {
        return None;
    }
    Some(1.0 - a.dot(&b) as f64 / norm)
}

fn by_quality(a: &CandidateProduct, b: &CandidateProduct) -> Ordering {
    let (pa, pb) = (&a.product, &b.product);
    pb.quality_score
        .total_cmp(&pa.quality_score)
        .then_with(|| pb.popularity_score.total_cmp(&pa.popularity_score))
        .then_with(|| pb.rating.total_cmp(&pa.rating))
        .then_with(|| pa.id.cmp(&pb.id))
}

/// Catalog held in memory. Every entry is considered approved and in stock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<CandidateProduct>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<CandidateProduct>) -> Self {
        Self { products }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> StoreResult<Vec<CandidateProduct>> {
        let mut scored: Vec<(f64, &CandidateProduct)> = self
            .products
            .iter()
            .filter_map(|c| {
                let vector = c.product.embedding.as_deref()?;
                cosine_distance(embedding, vector).map(|d| (d, c))
            })
            .collect();

        scored.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.id().cmp(b.1.id()))
        });

        Ok(scored
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(distance, c)| CandidateProduct {
                similarity: similarity_from_distance(distance),
                ..c.clone()
            })
            .collect())
    }

    async fn filter_candidates(
        &self,
        filter: &CandidateFilter,
        limit: i64,
    ) -> StoreResult<Vec<CandidateProduct>> {
        let mut matches: Vec<CandidateProduct> = self
            .products
            .iter()
            .filter(|c| filter.min_price.map_or(true, |min| c.product.price >= min))
            .filter(|c| filter.max_price.map_or(true, |max| c.product.price <= max))
            .filter(|c| {
                filter.categories.is_empty()
                    || c.product
                        .categories
                        .iter()
                        .any(|cat| filter.categories.contains(cat))
            })
            .map(|c| CandidateProduct {
                similarity: 0.5,
                ..c.clone()
            })
            .collect();

        matches.sort_by(by_quality);
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }

    async fn products_in_category(
        &self,
        category: &str,
        limit: i64,
    ) -> StoreResult<Vec<CatalogProduct>> {
        let mut matches: Vec<&CandidateProduct> = self
            .products
            .iter()
            .filter(|c| c.product.categories.iter().any(|cat| cat == category))
            .collect();

        matches.sort_by(|a, b| {
            b.product
                .popularity_score
                .total_cmp(&a.product.popularity_score)
                .then_with(|| a.id().cmp(b.id()))
        });

        Ok(matches
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|c| c.product.clone())
            .collect())
    }
}

/// Interaction history keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryInteractions {
    records: DashMap<String, Vec<InteractionRecord>>,
}

impl InMemoryInteractions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, user_id: &str, record: InteractionRecord) {
        self.records
            .entry(user_id.to_string())
            .or_default()
            .push(record);
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractions {
    async fn load_interactions(&self, user_id: &str) -> StoreResult<Vec<InteractionRecord>> {
        Ok(self
            .records
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}
