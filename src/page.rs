//! Slices an ordered list of records into fixed-size listing pages.

use crate::record::Record;

/// Page-to-page navigation data for one listing page. Page numbers are
/// 1-based. `prev_page` and `next_page` are only meaningful when the matching
/// `has_*` flag is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: usize,
    pub next_page: usize,
}

impl Pagination {
    fn new(current_page: usize, total_pages: usize) -> Pagination {
        Pagination {
            current_page,
            total_pages,
            has_prev: current_page > 1,
            has_next: current_page < total_pages,
            prev_page: current_page - 1,
            next_page: current_page + 1,
        }
    }
}

/// One listing page: a slice of records plus its [`Pagination`].
#[derive(Debug)]
pub struct Page<'a> {
    pub records: &'a [Record],
    pub pagination: Pagination,
}

impl Page<'_> {
    /// The output path of the page relative to the site root. Page 1 is the
    /// site root itself; later pages live under `page/<n>/`.
    pub fn file_path(&self) -> String {
        page_path(self.pagination.current_page)
    }
}

/// The output path of listing page `number`.
pub fn page_path(number: usize) -> String {
    match number {
        0 | 1 => String::from("index.html"),
        n => format!("page/{}/index.html", n),
    }
}

/// The site-relative link to listing page `number`.
pub fn page_link(number: usize) -> String {
    match number {
        0 | 1 => String::from("/"),
        n => format!("/page/{}/", n),
    }
}

/// The number of pages needed for `total` records at `page_size` per page.
pub fn total_pages(total: usize, page_size: usize) -> usize {
    match total % page_size {
        0 => total / page_size,
        _ => total / page_size + 1,
    }
}

/// Splits `records` into pages of `page_size` records, preserving order. The
/// last page may be short; no records yields no pages.
///
/// # Panics
///
/// Panics if `page_size` is zero. [`crate::config::Config`] rejects a zero
/// page size when it's loaded and [`crate::build::Generator::new`] rejects one
/// set afterwards.
pub fn paginate(records: &[Record], page_size: usize) -> Vec<Page<'_>> {
    assert!(page_size > 0, "page size must be positive");
    let total = total_pages(records.len(), page_size);
    records
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| Page {
            records: chunk,
            pagination: Pagination::new(i + 1, total),
        })
        .collect()
}
