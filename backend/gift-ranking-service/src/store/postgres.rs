use super::{CandidateFilter, CatalogStore, InteractionStore, StoreResult};
use crate::models::{CandidateProduct, CatalogProduct, InteractionAction, InteractionRecord};
use crate::utils::{exponential_decay, similarity_from_distance};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, warn};

/// Recency halves every week.
const RECENCY_HALF_LIFE_HOURS: f64 = 24.0 * 7.0;

const PRODUCT_COLUMNS: &str = "id, title, price, categories, retailer, brand, quality_score, \
     popularity_score, rating, target_age_groups, created_at, is_vendor, is_sponsored";

const ELIGIBLE: &str = "status = 'APPROVED' AND in_stock AND is_available";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    title: String,
    price: f64,
    categories: Vec<String>,
    retailer: String,
    brand: Option<String>,
    quality_score: Option<f64>,
    popularity_score: Option<f64>,
    rating: Option<f64>,
    target_age_groups: Vec<String>,
    created_at: DateTime<Utc>,
    is_vendor: bool,
    is_sponsored: bool,
}

impl ProductRow {
    fn into_product(self, now: DateTime<Utc>) -> (CatalogProduct, bool, bool) {
        let age_hours = (now - self.created_at).num_minutes().max(0) as f64 / 60.0;
        let product = CatalogProduct {
            id: self.id,
            title: self.title,
            price: self.price,
            categories: self.categories,
            retailer: self.retailer,
            brand: self.brand,
            quality_score: self.quality_score.unwrap_or(0.0),
            popularity_score: self.popularity_score.unwrap_or(0.0),
            rating: self.rating.unwrap_or(0.0),
            recency_score: exponential_decay(age_hours, RECENCY_HALF_LIFE_HOURS),
            target_age_groups: self.target_age_groups,
            embedding: None,
            created_at: self.created_at,
        };
        (product, self.is_vendor, self.is_sponsored)
    }

    fn into_candidate(self, similarity: f64, now: DateTime<Utc>) -> CandidateProduct {
        let (product, is_vendor, is_sponsored) = self.into_product(now);
        CandidateProduct {
            product,
            similarity,
            is_vendor,
            is_sponsored,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NeighborRow {
    #[sqlx(flatten)]
    product: ProductRow,
    distance: f64,
}

/// pgvector text literal, e.g. `[0.1,0.2,0.3]`
fn vector_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Catalog backed by the `products` table (pgvector `embedding` column).
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> StoreResult<Vec<CandidateProduct>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, (embedding <=> $1::vector)::float8 AS distance \
             FROM products \
             WHERE {ELIGIBLE} AND embedding IS NOT NULL \
             ORDER BY distance ASC, id ASC \
             LIMIT $2"
        );

        let rows: Vec<NeighborRow> = sqlx::query_as(&sql)
            .bind(vector_literal(embedding))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(rows = rows.len(), limit, "Vector candidate query complete");

        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|row| {
                let similarity = similarity_from_distance(row.distance);
                row.product.into_candidate(similarity, now)
            })
            .collect())
    }

    async fn filter_candidates(
        &self,
        filter: &CandidateFilter,
        limit: i64,
    ) -> StoreResult<Vec<CandidateProduct>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} \
             FROM products \
             WHERE {ELIGIBLE} \
               AND ($1::float8 IS NULL OR price >= $1) \
               AND ($2::float8 IS NULL OR price <= $2) \
               AND (cardinality($3::text[]) = 0 OR categories && $3::text[]) \
             ORDER BY quality_score DESC NULLS LAST, popularity_score DESC NULLS LAST, \
                      rating DESC NULLS LAST, id ASC \
             LIMIT $4"
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(&filter.categories)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(rows = rows.len(), limit, "Attribute candidate query complete");

        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|row| row.into_candidate(0.5, now))
            .collect())
    }

    async fn products_in_category(
        &self,
        category: &str,
        limit: i64,
    ) -> StoreResult<Vec<CatalogProduct>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} \
             FROM products \
             WHERE {ELIGIBLE} AND $1 = ANY(categories) \
             ORDER BY popularity_score DESC NULLS LAST, id ASC \
             LIMIT $2"
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(category)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|row| row.into_product(now).0)
            .collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InteractionRow {
    product_id: String,
    action: String,
    categories: Vec<String>,
    price: f64,
    brand: Option<String>,
}

/// Interaction history from `user_interactions` joined with `products`.
#[derive(Clone)]
pub struct PgInteractionStore {
    pool: PgPool,
}

impl PgInteractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionStore for PgInteractionStore {
    async fn load_interactions(&self, user_id: &str) -> StoreResult<Vec<InteractionRecord>> {
        let rows: Vec<InteractionRow> = sqlx::query_as(
            "SELECT i.product_id, i.action, p.categories, p.price, p.brand \
             FROM user_interactions i \
             JOIN products p ON p.id = i.product_id \
             WHERE i.user_id = $1 AND i.action IN ('LIKE', 'DISLIKE', 'SAVE', 'CLICK') \
             ORDER BY i.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match InteractionAction::parse(&row.action) {
                Some(action) => Some(InteractionRecord {
                    product_id: row.product_id,
                    action,
                    categories: row.categories,
                    price: row.price,
                    brand: row.brand,
                }),
                None => {
                    warn!(action = %row.action, "Skipping interaction with unknown action");
                    None
                }
            })
            .collect())
    }
}
