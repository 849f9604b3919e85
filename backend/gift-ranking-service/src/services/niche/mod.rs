// ============================================
// Niche Detection
// ============================================
//
// NicheBooster: flat bonus for candidates whose categories sit mostly inside
// the user's learned interest set.
//
// NicheAnalyzer: on-demand aggregate of one category cluster of the catalog
// (NicheProfile). Not maintained incrementally.

use crate::models::{CatalogProduct, NichePriceRange, NicheProfile, RankedProduct, UserPreferences};
use crate::store::{with_timeout, CatalogStore, StoreResult};
use crate::utils::overlap_ratio;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const MAX_SUBCATEGORIES: usize = 10;
const GROWTH_RECENCY_THRESHOLD: f64 = 0.8;

pub struct NicheBooster {
    threshold: f64,
    bonus: f64,
}

impl NicheBooster {
    pub fn new(threshold: f64, bonus: f64) -> Self {
        Self { threshold, bonus }
    }

    /// Add `bonus` to every product whose category overlap with the
    /// preference keys reaches `threshold`. No-op without a profile.
    pub fn apply(&self, products: &mut [RankedProduct], preferences: Option<&UserPreferences>) {
        let Some(prefs) = preferences else {
            return;
        };
        if prefs.categories.is_empty() {
            return;
        }

        let mut boosted = 0usize;
        for product in products.iter_mut() {
            let ratio = overlap_ratio(product.categories(), |c| prefs.categories.contains_key(c));
            if ratio >= self.threshold {
                product.final_score += self.bonus;
                boosted += 1;
            }
        }

        debug!(
            boosted,
            total = products.len(),
            threshold = self.threshold,
            "Niche boost applied"
        );
    }
}

pub struct NicheAnalyzer {
    catalog: Arc<dyn CatalogStore>,
    timeout: Duration,
    sample_limit: i64,
}

impl NicheAnalyzer {
    pub fn new(catalog: Arc<dyn CatalogStore>, timeout: Duration) -> Self {
        Self {
            catalog,
            timeout,
            sample_limit: 500,
        }
    }

    pub fn with_sample_limit(mut self, limit: i64) -> Self {
        self.sample_limit = limit;
        self
    }

    pub async fn profile(&self, category: &str) -> StoreResult<NicheProfile> {
        let products = with_timeout(
            "products_in_category",
            self.timeout,
            self.catalog.products_in_category(category, self.sample_limit),
        )
        .await?;

        Ok(aggregate_niche(category, &products))
    }
}

pub fn aggregate_niche(category: &str, products: &[CatalogProduct]) -> NicheProfile {
    let count = products.len();

    let mut co_occurring: HashMap<String, u32> = HashMap::new();
    let mut demographic_spread: HashMap<String, u32> = HashMap::new();
    for product in products {
        for other in product.categories.iter().filter(|c| c.as_str() != category) {
            *co_occurring.entry(other.clone()).or_insert(0) += 1;
        }
        for group in &product.target_age_groups {
            *demographic_spread.entry(group.clone()).or_insert(0) += 1;
        }
    }

    let mut subcategories: Vec<(String, u32)> = co_occurring.into_iter().collect();
    subcategories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    subcategories.truncate(MAX_SUBCATEGORIES);

    let price_range = if count == 0 {
        None
    } else {
        let min = products.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
        let max = products.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
        Some(NichePriceRange {
            min,
            max,
            average: mean(products.iter().map(|p| p.price), count),
        })
    };

    let avg_popularity = mean(products.iter().map(|p| p.popularity_score), count);
    let recent = products
        .iter()
        .filter(|p| p.recency_score > GROWTH_RECENCY_THRESHOLD)
        .count();

    NicheProfile {
        category: category.to_string(),
        subcategories,
        price_range,
        demographic_spread,
        avg_quality: mean(products.iter().map(|p| p.quality_score), count),
        avg_rating: mean(products.iter().map(|p| p.rating), count),
        avg_popularity,
        popularity: (avg_popularity / 100.0).clamp(0.0, 1.0),
        growth: if count == 0 {
            0.0
        } else {
            recent as f64 / count as f64
        },
        product_count: count,
    }
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}
