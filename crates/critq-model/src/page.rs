//! Paginated results.

use serde::{Deserialize, Serialize};

/// One page of results plus the total number of matching entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage<T> {
    /// Distinct entities matching the filter, across all pages.
    pub total_count: u64,
    /// 1-based page number.
    pub page_number: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Entities on this page; never more than `page_size`.
    pub results: Vec<T>,
}

impl<T> ResultPage<T> {
    pub fn new(total_count: u64, page_number: u32, page_size: u32, results: Vec<T>) -> Self {
        Self {
            total_count,
            page_number,
            page_size,
            results,
        }
    }

    /// Number of pages needed to cover `total_count`.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page_number) < self.page_count()
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Convert the results, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResultPage<U> {
        ResultPage {
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
