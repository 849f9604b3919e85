//! Individual scoring signals.
//!
//! Each strategy maps one candidate to a score in [0, 1]. Strategies that
//! depend on a preference profile return the neutral 0.5 on cold start.

use crate::config::ContentWeights;
use crate::models::{CandidateProduct, PriceRange, SessionProfile, UserPreferences};
use crate::utils::{normalize_percent, overlap_ratio};

pub const NEUTRAL_SCORE: f64 = 0.5;

/// Inputs shared by every strategy for one request.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub session: &'a SessionProfile,
    pub preferences: Option<&'a UserPreferences>,
}

pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, ctx: &ScoringContext<'_>, candidate: &CandidateProduct) -> f64;
}

/// How well `price` sits around the preferred price of the observed range.
///
/// Outside the range scores 0. A degenerate range (min == max) or no range
/// at all scores neutral.
pub fn price_fit(price: f64, range: Option<&PriceRange>) -> f64 {
    let Some(range) = range else {
        return NEUTRAL_SCORE;
    };
    if price < range.min || price > range.max {
        return 0.0;
    }
    let span = range.max - range.min;
    if span <= f64::EPSILON {
        return NEUTRAL_SCORE;
    }
    (1.0 - (price - range.preferred).abs() / span).clamp(0.0, 1.0)
}

/// Share of the candidate's categories the user has liked before.
pub fn category_overlap(candidate: &CandidateProduct, prefs: &UserPreferences) -> f64 {
    overlap_ratio(&candidate.product.categories, |c| {
        prefs.categories.contains_key(c)
    })
}

/// Category, price, quality and embedding similarity against the profile.
pub struct ContentBasedStrategy {
    weights: ContentWeights,
}

impl ContentBasedStrategy {
    pub fn new(weights: ContentWeights) -> Self {
        Self { weights }
    }
}

impl ScoringStrategy for ContentBasedStrategy {
    fn name(&self) -> &'static str {
        "content_based"
    }

    fn score(&self, ctx: &ScoringContext<'_>, candidate: &CandidateProduct) -> f64 {
        let Some(prefs) = ctx.preferences else {
            return NEUTRAL_SCORE;
        };

        let category = category_overlap(candidate, prefs);
        let price = price_fit(candidate.product.price, prefs.price_range.as_ref());
        let quality = normalize_percent(candidate.product.quality_score);

        category * self.weights.category_weight
            + price * self.weights.price_weight
            + quality * self.weights.rating_weight
            + candidate.similarity * self.weights.embedding_weight
    }
}

/// Popularity/quality stand-in for collaborative filtering. No user-user or
/// item-item matrix is computed.
pub struct CollaborativeProxyStrategy;

impl ScoringStrategy for CollaborativeProxyStrategy {
    fn name(&self) -> &'static str {
        "collaborative_proxy"
    }

    fn score(&self, _ctx: &ScoringContext<'_>, candidate: &CandidateProduct) -> f64 {
        let popularity = normalize_percent(candidate.product.popularity_score);
        let quality = normalize_percent(candidate.product.quality_score);
        (popularity + quality) / 2.0
    }
}

/// Constant 0.5. Stands in for the deep-learning model until one exists.
pub struct NeutralStrategy {
    name: &'static str,
}

impl NeutralStrategy {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl ScoringStrategy for NeutralStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn score(&self, _ctx: &ScoringContext<'_>, _candidate: &CandidateProduct) -> f64 {
        NEUTRAL_SCORE
    }
}

/// (category, age group, bonus)
const DEMOGRAPHIC_AFFINITIES: &[(&str, &str, f64)] =
    &[("Electronics", "18-34", 0.2), ("Books", "35-54", 0.15)];

/// Fixed category / recipient-age affinities on top of a 0.5 base.
pub struct DemographicStrategy;

impl ScoringStrategy for DemographicStrategy {
    fn name(&self) -> &'static str {
        "demographic"
    }

    fn score(&self, ctx: &ScoringContext<'_>, candidate: &CandidateProduct) -> f64 {
        if ctx.preferences.is_none() {
            return NEUTRAL_SCORE;
        }
        let Some(age_group) = ctx.session.constraints.age_group.as_deref() else {
            return NEUTRAL_SCORE;
        };

        let bonus: f64 = DEMOGRAPHIC_AFFINITIES
            .iter()
            .filter(|(category, group, _)| {
                *group == age_group && candidate.product.categories.iter().any(|c| c == category)
            })
            .map(|(_, _, bonus)| bonus)
            .sum();

        (NEUTRAL_SCORE + bonus).clamp(0.0, 1.0)
    }
}

/// 1 minus the share of the candidate's categories the user disliked.
///
/// Registered only when `dislike_weight > 0`.
pub struct DislikePenaltyStrategy;

impl ScoringStrategy for DislikePenaltyStrategy {
    fn name(&self) -> &'static str {
        "dislike_penalty"
    }

    fn score(&self, ctx: &ScoringContext<'_>, candidate: &CandidateProduct) -> f64 {
        let Some(prefs) = ctx.preferences else {
            return NEUTRAL_SCORE;
        };
        1.0 - overlap_ratio(&candidate.product.categories, |c| {
            prefs.disliked_categories.contains_key(c)
        })
    }
}
