//! Upstream collaborators of the ranking pipeline.
//!
//! The catalog and the interaction history are systems of record owned by
//! other services. The pipeline only reads them through these traits, with
//! every call bounded by [`with_timeout`].

mod memory;
mod postgres;

pub use memory::{CatalogFixture, InMemoryCatalog, InMemoryInteractions};
pub use postgres::{PgCatalogStore, PgInteractionStore};

use crate::models::{CandidateProduct, CatalogProduct, InteractionRecord};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Attribute filter for the non-vector retrieval path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Match any of these; empty means no category restriction
    pub categories: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Approved, in-stock, available products ordered by ascending cosine
    /// distance to `embedding`. `similarity` is `1 - distance`.
    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> StoreResult<Vec<CandidateProduct>>;

    /// Approved, in-stock, available products matching `filter`, ordered by
    /// quality, popularity, then rating.
    async fn filter_candidates(
        &self,
        filter: &CandidateFilter,
        limit: i64,
    ) -> StoreResult<Vec<CandidateProduct>>;

    async fn products_in_category(
        &self,
        category: &str,
        limit: i64,
    ) -> StoreResult<Vec<CatalogProduct>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// LIKE / DISLIKE / SAVE / CLICK history joined with product attributes.
    /// Unknown users yield an empty list.
    async fn load_interactions(&self, user_id: &str) -> StoreResult<Vec<InteractionRecord>>;
}

/// Bound a data-layer call. Dropping the inner future on elapse cancels it.
pub async fn with_timeout<F, T>(
    operation: &'static str,
    duration: Duration,
    future: F,
) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            elapsed: duration,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_success() {
        let result = with_timeout("noop", Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_timeout_elapsed() {
        let result: StoreResult<i32> = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(42)
        })
        .await;

        assert!(matches!(
            result,
            Err(StoreError::Timeout {
                operation: "slow",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_timeout_passes_inner_error() {
        let result: StoreResult<i32> = with_timeout("failing", Duration::from_secs(1), async {
            Err(StoreError::Unavailable("down".to_string()))
        })
        .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
