// ============================================
// Ingestion Deduplication
// ============================================
//
// Affiliate feeds (Rainforest/Amazon, eBay) and vendor uploads overlap.
// Before products reach the catalog, a batch is collapsed so that:
// - the same (source, external_id) appears once
// - the same normalized title at the same retailer appears once
// The record with the higher quality score survives; ties keep the first.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSource {
    Amazon,
    Ebay,
    Vendor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedProduct {
    pub source: ProductSource,
    pub external_id: String,
    pub title: String,
    pub retailer: String,
    pub price: f64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub quality_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub input: usize,
    pub unique: usize,
    pub dropped_by_id: usize,
    pub dropped_by_title: usize,
}

/// Lowercase, keep alphanumerics, collapse everything else to single spaces.
pub fn normalize_title(title: &str) -> String {
    let mut normalized = String::with_capacity(title.len());
    let mut pending_space = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    normalized
}

#[derive(Debug, Default)]
pub struct ProductDeduplicator;

impl ProductDeduplicator {
    pub fn new() -> Self {
        Self
    }

    pub fn deduplicate(&self, batch: Vec<IngestedProduct>) -> (Vec<IngestedProduct>, DedupStats) {
        let mut stats = DedupStats {
            input: batch.len(),
            ..Default::default()
        };

        let mut unique: Vec<IngestedProduct> = Vec::new();
        let mut by_id: HashMap<(ProductSource, String), usize> = HashMap::new();
        let mut by_title: HashMap<(String, String), usize> = HashMap::new();

        for product in batch {
            let id_key = (product.source, product.external_id.clone());
            let title_key = (
                product.retailer.to_lowercase(),
                normalize_title(&product.title),
            );

            let existing = match by_id.get(&id_key) {
                Some(&idx) => {
                    stats.dropped_by_id += 1;
                    Some(idx)
                }
                None => match by_title.get(&title_key) {
                    Some(&idx) => {
                        stats.dropped_by_title += 1;
                        Some(idx)
                    }
                    None => None,
                },
            };

            match existing {
                Some(idx) => {
                    if product.quality_score > unique[idx].quality_score {
                        unique[idx] = product;
                    }
                    by_id.insert(id_key, idx);
                    by_title.insert(title_key, idx);
                }
                None => {
                    let idx = unique.len();
                    by_id.insert(id_key, idx);
                    by_title.insert(title_key, idx);
                    unique.push(product);
                }
            }
        }

        stats.unique = unique.len();

        info!(
            input = stats.input,
            unique = stats.unique,
            dropped_by_id = stats.dropped_by_id,
            dropped_by_title = stats.dropped_by_title,
            "Ingestion batch deduplicated"
        );

        (unique, stats)
    }
}
