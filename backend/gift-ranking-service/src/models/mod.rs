use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request-scoped description of who we are recommending for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionProfile {
    pub session_id: String,
    /// Quiz-derived embedding; selects the vector retrieval path when present
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub constraints: SessionConstraints,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConstraints {
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub seen_ids: Vec<String>,
    /// Recipient age bucket, e.g. "18-34"
    #[serde(default)]
    pub age_group: Option<String>,
}

/// Catalog row as the catalog store returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub categories: Vec<String>,
    pub retailer: String,
    #[serde(default)]
    pub brand: Option<String>,
    /// 0 - 100
    #[serde(default)]
    pub quality_score: f64,
    /// 0 - 100
    #[serde(default)]
    pub popularity_score: f64,
    /// 0 - 5
    #[serde(default)]
    pub rating: f64,
    /// 1.0 = listed just now, decays towards 0
    #[serde(default)]
    pub recency_score: f64,
    #[serde(default)]
    pub target_age_groups: Vec<String>,
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Catalog product fetched for possible recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProduct {
    #[serde(flatten)]
    pub product: CatalogProduct,
    #[serde(default)]
    pub similarity: f64,
    #[serde(default)]
    pub is_vendor: bool,
    #[serde(default)]
    pub is_sponsored: bool,
}

impl CandidateProduct {
    pub fn id(&self) -> &str {
        &self.product.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedProduct {
    #[serde(flatten)]
    pub candidate: CandidateProduct,
    pub final_score: f64,
    /// 1-based position in the diversified list; 0 until assigned
    pub rank: usize,
}

impl RankedProduct {
    pub fn id(&self) -> &str {
        self.candidate.id()
    }

    pub fn categories(&self) -> &[String] {
        &self.candidate.product.categories
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionAction {
    Like,
    Dislike,
    Save,
    Click,
}

impl InteractionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionAction::Like => "LIKE",
            InteractionAction::Dislike => "DISLIKE",
            InteractionAction::Save => "SAVE",
            InteractionAction::Click => "CLICK",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "LIKE" => Some(InteractionAction::Like),
            "DISLIKE" => Some(InteractionAction::Dislike),
            "SAVE" => Some(InteractionAction::Save),
            "CLICK" => Some(InteractionAction::Click),
            _ => None,
        }
    }
}

/// One historical interaction joined with the product it touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub product_id: String,
    pub action: InteractionAction,
    #[serde(default)]
    pub categories: Vec<String>,
    pub price: f64,
    #[serde(default)]
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub preferred: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRates {
    pub click_rate: f64,
    pub save_rate: f64,
    pub purchase_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionHistory {
    pub total_interactions: usize,
    pub favorite_categories: Vec<String>,
}

/// Aggregate derived from a user's interaction history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub categories: HashMap<String, u32>,
    pub price_range: Option<PriceRange>,
    pub brands: HashMap<String, u32>,
    pub disliked_categories: HashMap<String, u32>,
    pub behavior: BehaviorRates,
    pub history: InteractionHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NichePriceRange {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

/// Aggregate over one category cluster of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NicheProfile {
    pub category: String,
    pub subcategories: Vec<(String, u32)>,
    pub price_range: Option<NichePriceRange>,
    pub demographic_spread: HashMap<String, u32>,
    pub avg_quality: f64,
    pub avg_rating: f64,
    pub avg_popularity: f64,
    pub popularity: f64,
    pub growth: f64,
    pub product_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub session: SessionProfile,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationPage {
    pub page: i64,
    pub has_more: bool,
    pub products: Vec<RankedProduct>,
}

impl RecommendationPage {
    pub fn empty(page: i64) -> Self {
        Self {
            page,
            has_more: false,
            products: Vec::new(),
        }
    }
}
