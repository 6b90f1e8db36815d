//! Pagination
//!
//! A [`PageWindow`] turns the raw `page` query value into a clamped page
//! number and the offset/limit pair handed to the repositories. [`Page`]
//! carries one window of items together with the metadata the templates
//! need for the pager widget.
//!
//! Out-of-range input never fails: anything that is not a positive integer
//! resolves to the first page, and a number past the end resolves to the
//! last page.

use serde::Serialize;

/// Pages shown on each side of the current one in `page_range`
const PAGE_RANGE_RADIUS: i64 = 3;

/// Parse a raw `page` value into a positive page number.
///
/// Digit strings too large for `i64` saturate to `i64::MAX`, so they still
/// clamp to the last page.
pub fn parse_page_number(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    match raw.parse::<i64>() {
        Ok(n) => Some(n).filter(|n| *n >= 1),
        Err(_) => {
            let digits = raw.strip_prefix('+').unwrap_or(raw);
            let overflowed = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
            overflowed.then_some(i64::MAX)
        }
    }
}

/// A resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Current page, always within `1..=num_pages`
    pub number: i64,
    /// Total number of pages, never less than 1
    pub num_pages: i64,
    /// Page size
    pub per_page: i64,
}

impl PageWindow {
    /// Resolve the requested page against a collection of `total` items
    pub fn resolve(requested: Option<&str>, total: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let total = total.max(0);
        let num_pages = ((total + per_page - 1) / per_page).max(1);
        let number = parse_page_number(requested).unwrap_or(1).min(num_pages);

        Self {
            number,
            num_pages,
            per_page,
        }
    }

    /// Number of items to skip
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    /// Maximum number of items in the window
    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// One page of items plus pager metadata
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub per_page: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
    /// Page numbers around the current one, for the pager links
    pub page_range: Vec<i64>,
}

impl<T> Page<T> {
    /// Wrap the items fetched for `window`
    pub fn new(items: Vec<T>, window: PageWindow, total: i64) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        let first = (window.number - PAGE_RANGE_RADIUS).max(1);
        let last = (window.number + PAGE_RANGE_RADIUS).min(window.num_pages);

        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            per_page: window.per_page,
            total: total.max(0),
            has_next,
            has_previous,
            next_page_number: has_next.then_some(window.number + 1),
            previous_page_number: has_previous.then_some(window.number - 1),
            page_range: (first..=last).collect(),
        }
    }

    /// An empty single page
    pub fn empty(per_page: i64) -> Self {
        Self::new(Vec::new(), PageWindow::resolve(None, 0, per_page), 0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert the items while keeping the metadata
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            per_page: self.per_page,
            total: self.total,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
            page_range: self.page_range,
        }
    }
}

/// Window an in-memory collection
pub fn paginate<T>(items: Vec<T>, requested: Option<&str>, per_page: i64) -> Page<T> {
    let total = items.len() as i64;
    let window = PageWindow::resolve(requested, total, per_page);
    let slice: Vec<T> = items
        .into_iter()
        .skip(window.offset() as usize)
        .take(window.limit() as usize)
        .collect();
    Page::new(slice, window, total)
}
