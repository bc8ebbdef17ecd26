//! Pagination
//!
//! Turns an item count and a requested page into the window a listing query
//! should fetch.

use serde::Serialize;

use super::Limit;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// One page of a listing, recomputed per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub item_count: u64,
    pub page_size: u64,
    pub page_index: u64,
    pub page_count: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    /// Compute the page window.
    ///
    /// An empty listing, or a page past the end, clamps to page 1 with an
    /// empty window. A zero page size is treated as 1.
    pub fn new(item_count: u64, page_index: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let page_count = item_count.div_ceil(page_size);

        let (page_index, offset, limit) = if item_count == 0 || page_index > page_count {
            (1, 0, 0)
        } else {
            let page_index = page_index.max(1);
            (page_index, page_size * (page_index - 1), page_size)
        };

        Self {
            item_count,
            page_size,
            page_index,
            page_count,
            offset,
            limit,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }

    pub fn with_default_size(item_count: u64, page_index: u64) -> Self {
        Self::new(item_count, page_index, DEFAULT_PAGE_SIZE)
    }

    /// LIMIT window for the listing query
    pub fn window(&self) -> Limit {
        Limit::Window {
            offset: self.offset as i64,
            count: self.limit as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_listing_clamps() {
        let page = Page::new(0, 5, 10);
        assert_eq!(
            page,
            Page {
                item_count: 0,
                page_size: 10,
                page_index: 1,
                page_count: 0,
                offset: 0,
                limit: 0,
                has_next: false,
                has_previous: false,
            }
        );
    }

    #[test]
    fn test_middle_page() {
        let page = Page::new(25, 2, 10);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.offset, 10);
        assert_eq!(page.limit, 10);
        assert!(page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let page = Page::new(25, 99, 10);
        assert_eq!(page.page_index, 1);
        assert_eq!(page.offset, 0);
        assert_eq!(page.limit, 0);
        assert_eq!(page.page_count, 3);
    }

    #[test]
    fn test_last_page() {
        let page = Page::new(25, 3, 10);
        assert_eq!(page.offset, 20);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn test_exact_multiple() {
        let page = Page::new(20, 1, 10);
        assert_eq!(page.page_count, 2);
        assert!(page.has_next);
        assert!(!page.has_previous);
        assert_eq!(page.window(), Limit::Window { offset: 0, count: 10 });
    }
}
