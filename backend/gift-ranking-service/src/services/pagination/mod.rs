use crate::error::{EngineError, Result};
use crate::models::{RankedProduct, RecommendationPage};

/// Slice `[page * page_size, page * page_size + page_size)` out of the
/// ranked list.
pub fn paginate(products: Vec<RankedProduct>, page: i64, page_size: i64) -> Result<RecommendationPage> {
    if page < 0 {
        return Err(EngineError::InvalidArgument(format!(
            "page must be >= 0, got {}",
            page
        )));
    }
    if page_size <= 0 {
        return Err(EngineError::InvalidArgument(format!(
            "page_size must be > 0, got {}",
            page_size
        )));
    }

    let total = products.len();
    let start = (page as u64).saturating_mul(page_size as u64);
    let end = start.saturating_add(page_size as u64);
    let has_more = (total as u64) > end;

    let products = if start >= total as u64 {
        Vec::new()
    } else {
        products
            .into_iter()
            .skip(start as usize)
            .take(page_size as usize)
            .collect()
    };

    Ok(RecommendationPage {
        page,
        has_more,
        products,
    })
}
