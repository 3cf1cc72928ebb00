//! Pagination primitives.

use serde::{Deserialize, Serialize};

/// Page number used when none is requested.
pub const DEFAULT_PAGE_NUMBER: u32 = 1;

/// Page size used when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// A one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PageParams")]
pub struct Page {
    number: u32,
    size: u32,
}

/// Wire form of [`Page`]; deserialization goes through the same clamping
/// as [`Page::from_params`].
#[derive(Deserialize)]
struct PageParams {
    number: Option<u32>,
    size: Option<u32>,
}

impl From<PageParams> for Page {
    fn from(params: PageParams) -> Self {
        Page::from_params(params.number, params.size)
    }
}

impl Page {
    /// Creates a page, clamping zero values to one.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// Builds a page from optional request parameters, using defaults for
    /// whatever is missing.
    pub fn from_params(number: Option<u32>, size: Option<u32>) -> Self {
        Self::new(
            number.unwrap_or(DEFAULT_PAGE_NUMBER),
            size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }

    /// Returns the one-based page number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns the page size.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE)
    }
}

/// A page of results together with the total count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub limit: u32,
    pub offset: u64,
    pub total_count: u64,
}

impl<T> Paginated<T> {
    /// Wraps the rows returned for `page`.
    pub fn new(items: Vec<T>, page: Page, total_count: u64) -> Self {
        Self {
            items,
            limit: page.size(),
            offset: page.offset(),
            total_count,
        }
    }

    /// One-based index of this page: `offset / limit + 1`.
    pub fn current_page(&self) -> u64 {
        self.offset / u64::from(self.limit.max(1)) + 1
    }

    /// Number of pages needed for all rows: `ceil(total / limit)`.
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(u64::from(self.limit.max(1)))
    }

    /// Maps every item, preserving the pagination envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            limit: self.limit,
            offset: self.offset,
            total_count: self.total_count,
        }
    }
}
