//! Pagination arithmetic and the cached page envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for out-of-range pagination bounds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(u32),
    #[error("page must be at least 1, got {0}")]
    InvalidPage(u32),
}

/// Validated `limit`/`page` pair. Pages are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: u32,
    page: u32,
}

impl PageRequest {
    pub fn new(limit: u32, page: u32) -> Result<Self, PaginationError> {
        if limit < 1 {
            return Err(PaginationError::InvalidLimit(limit));
        }
        if page < 1 {
            return Err(PaginationError::InvalidPage(page));
        }
        Ok(Self { limit, page })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Number of rows to skip: `(page - 1) * limit`. Computed in `u64`, so
    /// it cannot overflow for any `u32` inputs.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// One page of results, as returned to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub limit: u32,
    pub page: u32,
    /// Number of items in `data`.
    pub count: usize,
    pub data: Vec<T>,
}

/// Wraps an already-sliced, already-ordered result set into a [`Page`].
///
/// The data is not re-sliced: fetching exactly one page is the store's job.
///
/// # Examples
///
/// ```
/// use cachedrepo_core::pagination::paginate;
///
/// let page = paginate(vec!["a", "b"], 10, 1).unwrap();
/// assert_eq!(page.count, 2);
/// assert!(paginate(vec!["a"], 0, 1).is_err());
/// ```
pub fn paginate<T>(data: Vec<T>, limit: u32, page: u32) -> Result<Page<T>, PaginationError> {
    let request = PageRequest::new(limit, page)?;
    Ok(Page {
        limit: request.limit(),
        page: request.page(),
        count: data.len(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_first_page_is_zero() {
        assert_eq!(PageRequest::new(5, 1).unwrap().offset(), 0);
    }

    #[test]
    fn test_offset_later_pages() {
        assert_eq!(PageRequest::new(5, 2).unwrap().offset(), 5);
        assert_eq!(PageRequest::new(10, 4).unwrap().offset(), 30);
    }

    #[test]
    fn test_offset_does_not_overflow() {
        let request = PageRequest::new(u32::MAX, u32::MAX).unwrap();
        assert_eq!(
            request.offset(),
            u64::from(u32::MAX - 1) * u64::from(u32::MAX)
        );
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert_eq!(
            PageRequest::new(0, 1),
            Err(PaginationError::InvalidLimit(0))
        );
    }

    #[test]
    fn test_zero_page_rejected() {
        assert_eq!(PageRequest::new(5, 0), Err(PaginationError::InvalidPage(0)));
    }

    #[test]
    fn test_paginate_wraps_without_slicing() {
        let data: Vec<u32> = (0..20).collect();

        let page = paginate(data, 10, 1).unwrap();

        assert_eq!(page.limit, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.count, 20);
        assert_eq!(page.data.len(), 20);
    }

    #[test]
    fn test_paginate_empty_data() {
        let page = paginate(Vec::<u32>::new(), 5, 3).unwrap();

        assert_eq!(page.count, 0);
        assert!(page.data.is_empty());
    }

    #[test]
    fn test_paginate_rejects_bad_bounds() {
        assert!(paginate(vec![1], 0, 1).is_err());
        assert!(paginate(vec![1], 1, 0).is_err());
    }

    #[test]
    fn test_pagination_error_display() {
        assert_eq!(
            PaginationError::InvalidLimit(0).to_string(),
            "limit must be at least 1, got 0"
        );
        assert_eq!(
            PaginationError::InvalidPage(0).to_string(),
            "page must be at least 1, got 0"
        );
    }
}
