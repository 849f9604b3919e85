/// Multi-Signal Scorer
///
/// Blends the registered [`ScoringStrategy`] signals into one `final_score`
/// per candidate.
///
/// # Weighting
/// - Each strategy is paired with its configured stage weight
/// - Disabled strategies are simply not registered, so their weight drops
///   out of the sum instead of being redistributed
/// - With `renormalize_weights` the blend is divided by the sum of the
///   registered weights
///
/// # Ordering
/// `final_score` descending, ties broken by product id ascending.
pub mod strategies;

pub use strategies::{
    CollaborativeProxyStrategy, ContentBasedStrategy, DemographicStrategy,
    DislikePenaltyStrategy, NeutralStrategy, ScoringContext, ScoringStrategy, NEUTRAL_SCORE,
};

use crate::config::EngineConfig;
use crate::models::{CandidateProduct, RankedProduct};
use tracing::debug;

/// Sort by `final_score` descending, then id ascending.
pub fn sort_ranked(products: &mut [RankedProduct]) {
    products.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| a.id().cmp(b.id()))
    });
}

pub struct HybridScorer {
    strategies: Vec<(Box<dyn ScoringStrategy>, f64)>,
    renormalize: bool,
}

impl HybridScorer {
    pub fn new(strategies: Vec<(Box<dyn ScoringStrategy>, f64)>, renormalize: bool) -> Self {
        Self {
            strategies,
            renormalize,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let hybrid = &config.hybrid;
        let mut strategies: Vec<(Box<dyn ScoringStrategy>, f64)> = vec![
            (
                Box::new(ContentBasedStrategy::new(config.content_based.clone())),
                hybrid.content_weight,
            ),
            (
                Box::new(CollaborativeProxyStrategy),
                hybrid.collaborative_weight,
            ),
            (Box::new(DemographicStrategy), hybrid.demographic_weight),
        ];

        if config.deep_learning_enabled {
            strategies.push((
                Box::new(NeutralStrategy::new("deep_learning")),
                hybrid.deep_weight,
            ));
        }

        if hybrid.dislike_weight > 0.0 {
            strategies.push((Box::new(DislikePenaltyStrategy), hybrid.dislike_weight));
        }

        Self::new(strategies, config.renormalize_weights)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|(s, _)| s.name()).collect()
    }

    pub fn score(&self, ctx: &ScoringContext<'_>, candidate: &CandidateProduct) -> f64 {
        let blended: f64 = self
            .strategies
            .iter()
            .map(|(strategy, weight)| strategy.score(ctx, candidate) * weight)
            .sum();

        if self.renormalize {
            let total: f64 = self.strategies.iter().map(|(_, w)| w).sum();
            if total > 0.0 {
                return blended / total;
            }
        }

        blended
    }

    /// Score every candidate and return them best first.
    pub fn rank(
        &self,
        ctx: &ScoringContext<'_>,
        candidates: Vec<CandidateProduct>,
    ) -> Vec<RankedProduct> {
        let mut ranked: Vec<RankedProduct> = candidates
            .into_iter()
            .map(|candidate| {
                let final_score = self.score(ctx, &candidate);
                RankedProduct {
                    candidate,
                    final_score,
                    rank: 0,
                }
            })
            .collect();

        sort_ranked(&mut ranked);

        debug!(
            session_id = %ctx.session.session_id,
            scored = ranked.len(),
            top_score = ranked.first().map(|p| p.final_score),
            cold_start = ctx.preferences.is_none(),
            "Scoring complete"
        );

        ranked
    }
}
