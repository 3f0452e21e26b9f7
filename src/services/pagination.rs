//! Page windows over an already-ordered collection

use serde::Serialize;

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Page actually served, after clamping
    pub page: usize,
    pub per_page: usize,
    /// Size of the whole collection
    pub total: usize,
    pub total_pages: usize,
}

/// Total pages for `count` items; never less than one.
pub fn total_pages(count: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    count.div_ceil(per_page).max(1)
}

/// Slice page `page` (1-indexed) out of `items`.
///
/// Out-of-range page numbers are clamped into `[1, total_pages]` and a zero
/// page size is treated as one.
pub fn paginate<T: Clone>(items: &[T], per_page: usize, page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = total_pages(items.len(), per_page);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(items.len());
    let window = items.get(start..end).unwrap_or_default();

    Page {
        items: window.to_vec(),
        page,
        per_page,
        total: items.len(),
        total_pages,
    }
}
