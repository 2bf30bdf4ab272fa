//! Pagination of list results.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One page of a list result. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    /// `ceil(total / limit)`, 0 for an empty result
    pub total_pages: usize,
}

/// Cut `items` into the requested page. A page past the end is empty.
pub fn paginate<T: Clone>(items: &[&T], page: usize, limit: usize) -> Result<Page<T>> {
    if page == 0 {
        return Err(Error::Validation("page must be at least 1".to_string()));
    }
    if limit == 0 {
        return Err(Error::Validation("limit must be at least 1".to_string()));
    }

    let total = items.len();
    let start = (page - 1).saturating_mul(limit);
    let page_items = items
        .iter()
        .skip(start)
        .take(limit)
        .map(|item| (*item).clone())
        .collect();

    Ok(Page {
        items: page_items,
        total,
        page,
        total_pages: total.div_ceil(limit),
    })
}
