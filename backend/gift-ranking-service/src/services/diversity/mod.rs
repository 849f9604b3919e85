use super::scoring::sort_ranked;
use crate::config::MAX_RESULTS_CAP;
use crate::models::RankedProduct;
use std::collections::HashSet;
use tracing::debug;

/// Diversity Layer - 多樣性 / 新鮮度重排
///
/// Single greedy pass in score order:
/// - drop products the caller has already seen (and duplicate ids)
/// - `diversity_boost` when a product brings a category or retailer not yet
///   seen earlier in the pass
/// - `novelty_boost` when its recency score exceeds the threshold
///
/// Earlier products get first claim on "new category" credit. The output is
/// capped at `max_results` (never above [`MAX_RESULTS_CAP`]) and re-sorted
/// by the boosted score.
pub struct DiversityLayer {
    diversity_boost: f64,
    novelty_boost: f64,
    novelty_threshold: f64,
    max_results: usize,
}

impl DiversityLayer {
    pub fn new(diversity_boost: f64, novelty_boost: f64) -> Self {
        Self {
            diversity_boost,
            novelty_boost,
            novelty_threshold: 0.8,
            max_results: MAX_RESULTS_CAP,
        }
    }

    pub fn with_novelty_threshold(mut self, threshold: f64) -> Self {
        self.novelty_threshold = threshold;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.min(MAX_RESULTS_CAP);
        self
    }

    /// Expects `products` sorted best first.
    pub fn rerank(&self, products: Vec<RankedProduct>, seen_ids: &[String]) -> Vec<RankedProduct> {
        let seen: HashSet<&str> = seen_ids.iter().map(String::as_str).collect();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut seen_categories: HashSet<String> = HashSet::new();
        let mut seen_retailers: HashSet<String> = HashSet::new();

        let input_count = products.len();
        let mut diversified: Vec<RankedProduct> =
            Vec::with_capacity(self.max_results.min(input_count));

        for mut product in products {
            if diversified.len() >= self.max_results {
                break;
            }
            if seen.contains(product.id()) || emitted.contains(product.id()) {
                continue;
            }

            let new_category = product
                .categories()
                .iter()
                .any(|c| !seen_categories.contains(c));
            let new_retailer = !seen_retailers.contains(&product.candidate.product.retailer);

            if new_category || new_retailer {
                product.final_score += self.diversity_boost;
            }
            if product.candidate.product.recency_score > self.novelty_threshold {
                product.final_score += self.novelty_boost;
            }

            seen_categories.extend(product.categories().iter().cloned());
            seen_retailers.insert(product.candidate.product.retailer.clone());
            emitted.insert(product.id().to_string());
            diversified.push(product);
        }

        sort_ranked(&mut diversified);
        for (i, product) in diversified.iter_mut().enumerate() {
            product.rank = i + 1;
        }

        debug!(
            input_count,
            output_count = diversified.len(),
            categories = seen_categories.len(),
            retailers = seen_retailers.len(),
            "Diversity rerank complete"
        );

        diversified
    }
}
