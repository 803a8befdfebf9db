//! Page arithmetic for the course listing

/// Courses per page
pub const PAGE_SIZE: i64 = 10;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET
    pub offset: i64,
}

/// Clamp the requested page into `[1, total_pages]` and derive the offset
///
/// # Examples
/// ```
/// use learnsmart_api::pagination::calculate_pagination;
///
/// // 25 courses = 3 pages (10 + 10 + 5)
/// let p = calculate_pagination(25, 2);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 10);
///
/// let p = calculate_pagination(25, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 20);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_results = total_results.max(0);
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.max(1).min(total_pages.max(1));

    Pagination {
        page,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page() {
        let p = calculate_pagination(15, 1);
        assert_eq!(p, Pagination { page: 1, total_pages: 2, offset: 0 });
    }

    #[test]
    fn test_exact_boundary() {
        let p = calculate_pagination(20, 2);
        assert_eq!(p, Pagination { page: 2, total_pages: 2, offset: 10 });
    }

    #[test]
    fn test_out_of_bounds_clamped() {
        assert_eq!(calculate_pagination(15, 99).page, 2);
        assert_eq!(calculate_pagination(15, 0).page, 1);
        assert_eq!(calculate_pagination(15, -3).offset, 0);
    }

    #[test]
    fn test_empty_catalog() {
        let p = calculate_pagination(0, 4);
        assert_eq!(p, Pagination { page: 1, total_pages: 0, offset: 0 });
    }
}
