//! Pagination envelope shared by listing operations.

use serde::{Deserialize, Serialize};

/// Pagination metadata returned alongside a page of rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// One page of results: `{ data, pagination }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// A resolved page window (1-based page, clamped limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Normalize caller-supplied paging parameters.
    ///
    /// Page numbers below 1 become 1; a missing or zero limit falls back to
    /// `default_limit`, and any limit is capped at `max_limit`.
    pub fn resolve(page: Option<u32>, limit: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = match limit {
            Some(0) | None => default_limit,
            Some(l) => l,
        }
        .min(max_limit.max(1));
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Wrap fetched rows in the pagination envelope.
    pub fn into_page<T>(self, data: Vec<T>, total: u64) -> Page<T> {
        let limit = u64::from(self.limit.max(1));
        let total_pages = total.div_ceil(limit) as u32;
        Page {
            data,
            pagination: Pagination {
                page: self.page,
                limit: self.limit,
                total,
                total_pages,
            },
        }
    }
}
