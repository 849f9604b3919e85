// ============================================
// Preference Profile Loader
// ============================================
//
// Derives a per-user preference summary from interaction history.
//
// - Category / price / brand statistics come from LIKE interactions only
// - DISLIKE categories are counted separately and left for opt-in strategies
// - Behavior rates are shares of the whole history
//
// A missing user, an empty history, or a data-layer failure all produce
// `None`, which the scorer treats as cold start.

pub mod cache;

pub use cache::{CacheError, MokaPreferenceCache, PreferenceCache, RedisPreferenceCache};

use crate::models::{
    BehaviorRates, InteractionAction, InteractionHistory, InteractionRecord, PriceRange,
    UserPreferences,
};
use crate::store::{with_timeout, InteractionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const FAVORITE_CATEGORY_COUNT: usize = 5;

pub struct PreferenceLoader {
    interactions: Arc<dyn InteractionStore>,
    cache: Arc<dyn PreferenceCache>,
    timeout: Duration,
}

impl PreferenceLoader {
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        cache: Arc<dyn PreferenceCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            interactions,
            cache,
            timeout,
        }
    }

    /// Cached profile, or a fresh one built from history on miss.
    pub async fn load(&self, session_id: &str) -> Option<UserPreferences> {
        match self.cache.get(session_id).await {
            Ok(Some(prefs)) => {
                debug!(session_id = %session_id, "Preference cache hit");
                return Some(prefs);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Preference cache read failed, treating as miss");
            }
        }

        let records = match with_timeout(
            "load_interactions",
            self.timeout,
            self.interactions.load_interactions(session_id),
        )
        .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Preference profile load failed, using cold start");
                return None;
            }
        };

        let prefs = build_preferences(&records)?;

        if let Err(e) = self.cache.put(session_id, prefs.clone()).await {
            warn!(session_id = %session_id, error = %e, "Failed to cache preferences");
        }

        debug!(
            session_id = %session_id,
            interactions = prefs.history.total_interactions,
            categories = prefs.categories.len(),
            "Preference profile built"
        );

        Some(prefs)
    }

    pub async fn invalidate(&self, session_id: &str) {
        if let Err(e) = self.cache.invalidate(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to invalidate cached preferences");
        }
    }
}

/// Aggregate interaction history. `None` for an empty history.
pub fn build_preferences(records: &[InteractionRecord]) -> Option<UserPreferences> {
    if records.is_empty() {
        return None;
    }

    let mut categories: HashMap<String, u32> = HashMap::new();
    let mut brands: HashMap<String, u32> = HashMap::new();
    let mut disliked_categories: HashMap<String, u32> = HashMap::new();
    let mut liked_prices: Vec<f64> = Vec::new();
    let mut clicks = 0usize;
    let mut saves = 0usize;

    for record in records {
        match record.action {
            InteractionAction::Like => {
                for category in &record.categories {
                    *categories.entry(category.clone()).or_insert(0) += 1;
                }
                if let Some(brand) = &record.brand {
                    *brands.entry(brand.clone()).or_insert(0) += 1;
                }
                if record.price.is_finite() {
                    liked_prices.push(record.price);
                }
            }
            InteractionAction::Dislike => {
                for category in &record.categories {
                    *disliked_categories.entry(category.clone()).or_insert(0) += 1;
                }
            }
            InteractionAction::Save => saves += 1,
            InteractionAction::Click => clicks += 1,
        }
    }

    let price_range = if liked_prices.is_empty() {
        None
    } else {
        let min = liked_prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = liked_prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let preferred = liked_prices.iter().sum::<f64>() / liked_prices.len() as f64;
        Some(PriceRange {
            min,
            max,
            preferred,
        })
    };

    let total = records.len();
    let behavior = BehaviorRates {
        click_rate: clicks as f64 / total as f64,
        save_rate: saves as f64 / total as f64,
        purchase_rate: 0.0,
    };

    let mut ranked: Vec<(&String, &u32)> = categories.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let favorite_categories = ranked
        .into_iter()
        .take(FAVORITE_CATEGORY_COUNT)
        .map(|(name, _)| name.clone())
        .collect();

    Some(UserPreferences {
        categories,
        price_range,
        brands,
        disliked_categories,
        behavior,
        history: InteractionHistory {
            total_interactions: total,
            favorite_categories,
        },
    })
}
