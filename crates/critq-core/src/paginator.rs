//! Offset pagination with a distinct-entity total count.

use critq_model::ResultPage;
use tracing::debug;

use crate::descriptor::QueryDescriptor;
use crate::entity::Entity;
use crate::error::{Result, UsageError};
use crate::executor::{to_entities, QueryExecutor};
use crate::session::Session;

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validate a 1-based page number and a page size.
    pub fn new(page_number: u32, page_size: u32) -> Result<Self, UsageError> {
        if page_number < 1 {
            return Err(UsageError::InvalidPageNumber(page_number));
        }
        if page_size < 1 {
            return Err(UsageError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> usize {
        (self.page_number as usize - 1).saturating_mul(self.page_size as usize)
    }

    /// Rows taken for this page.
    pub fn limit(&self) -> usize {
        self.page_size as usize
    }
}

impl<S: Session + ?Sized> QueryExecutor<'_, S> {
    /// Fetch one page and the total number of matching entities.
    ///
    /// The descriptor must define an ordering. The total is computed by a
    /// second query that reuses only the where-style and always counts
    /// distinct root entities, so join fan-out never inflates it.
    pub fn page<E: Entity>(
        &self,
        descriptor: &QueryDescriptor<'_, E>,
        page_number: u32,
        page_size: u32,
    ) -> Result<ResultPage<E>> {
        let request = PageRequest::new(page_number, page_size)?;
        if let Some(max) = self.config().max_page_size {
            if page_size > max {
                return Err(UsageError::PageSizeTooLarge {
                    requested: page_size,
                    max,
                }
                .into());
            }
        }

        let criteria = self.assemble(descriptor)?;
        if criteria.order_by.is_empty() {
            return Err(UsageError::MissingSortDefinition.into());
        }

        let mut typed = self.finalize::<E>(criteria, descriptor.fetch_plan())?;
        typed
            .set_first_result(request.offset())
            .set_max_results(request.limit());
        let rows = self.session().result_list(typed)?;

        let total_count = self.count_with(descriptor, true)?;

        debug!(
            entity = E::NAME,
            page_number,
            page_size,
            offset = request.offset(),
            rows = rows.len(),
            total_count,
            "page fetched"
        );

        Ok(ResultPage::new(
            total_count,
            page_number,
            page_size,
            to_entities(rows)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_window() {
        let request = PageRequest::new(3, 7).unwrap();
        assert_eq!(request.offset(), 14);
        assert_eq!(request.limit(), 7);
        assert_eq!(PageRequest::new(1, 1).unwrap().offset(), 0);
    }

    #[test]
    fn test_page_request_validation() {
        assert_eq!(PageRequest::new(0, 7), Err(UsageError::InvalidPageNumber(0)));
        assert_eq!(PageRequest::new(1, 0), Err(UsageError::InvalidPageSize(0)));
    }
}
