//! Page arithmetic for session browsing (100 rows/page)

use serde::Serialize;

/// Rows per page
pub const PAGE_SIZE: usize = 100;

/// Position of one page within a result of known length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    pub total_pages: usize,
    /// Index of the page's first row
    pub offset: usize,
}

impl Pagination {
    /// Row range of this page within `total_rows`
    pub fn range(&self, total_rows: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(total_rows);
        let end = (self.offset + PAGE_SIZE).min(total_rows);
        start..end
    }
}

/// Clamp `requested_page` into `[1, total_pages]` and compute its offset
///
/// ```
/// use artifact_explorer::pagination::calculate_pagination;
///
/// // 250 rows = 3 pages (100 + 100 + 50)
/// let p = calculate_pagination(250, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
///
/// // Out-of-bounds pages are clamped
/// let p = calculate_pagination(250, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.range(250), 200..250);
/// ```
pub fn calculate_pagination(total_rows: usize, requested_page: usize) -> Pagination {
    let total_pages = total_rows.div_ceil(PAGE_SIZE);
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * PAGE_SIZE;

    Pagination {
        page,
        total_pages,
        offset,
    }
}
