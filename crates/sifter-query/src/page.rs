//! Pagination.
//!
//! [`PageDescriptor`] turns the `page` and `page_size` parameters into an
//! offset/limit pair, clamping instead of failing. [`PageDescriptor::paginate`]
//! then computes the navigation links for a known total.
//!
//! | Input | Result |
//! |-------|--------|
//! | `page` missing, unparseable or `< 1` | page 1 |
//! | `page_size` missing, unparseable or outside `1..=max` | default size |
//! | `page` past the last page | empty slice, no `next` |

use serde::Serialize;

use crate::params::QueryParams;

/// Page size used when the request gives none or an invalid one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page size a request may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// Parameter names and size limits for pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub page_param: String,
    pub page_size_param: String,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PageSettings {
    fn default() -> Self {
        PageSettings {
            page_param: "page".to_string(),
            page_size_param: "page_size".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// One page of a result set: a 1-based page number and a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageDescriptor {
    page_number: usize,
    page_size: usize,
}

impl PageDescriptor {
    /// Creates a descriptor with the default limits.
    pub fn new(page_number: i64, page_size: i64) -> Self {
        Self::with_limits(page_number, page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    /// Creates a descriptor, clamping the page number to at least 1 and
    /// replacing an out-of-range page size with `default_size`.
    pub fn with_limits(
        page_number: i64,
        page_size: i64,
        default_size: usize,
        max_size: usize,
    ) -> Self {
        let page_number = usize::try_from(page_number).unwrap_or(0).max(1);
        let page_size = match usize::try_from(page_size) {
            Ok(size) if (1..=max_size).contains(&size) => size,
            _ => default_size,
        };
        PageDescriptor {
            page_number,
            page_size,
        }
    }

    /// Reads the page number and size from query parameters.
    pub fn from_params(params: &QueryParams, settings: &PageSettings) -> Self {
        let page = params
            .get(&settings.page_param)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(1);
        let size = params
            .get(&settings.page_size_param)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);
        Self::with_limits(page, size, settings.default_page_size, settings.max_page_size)
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of records before this page.
    pub fn offset(&self) -> usize {
        (self.page_number - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> usize {
        self.page_size
    }

    /// Computes the page result for `total` matching records.
    ///
    /// Links are built from `base_url` and a copy of `params` with only the
    /// page parameter rewritten. The link back to page 1 drops the page
    /// parameter entirely.
    pub fn paginate(
        &self,
        total: usize,
        base_url: &str,
        params: &QueryParams,
        page_param: &str,
    ) -> PageResult {
        let offset = self.offset();
        let limit = self.limit();

        let next = (offset.saturating_add(limit) < total).then(|| {
            params
                .with_replaced(page_param, (self.page_number + 1).to_string())
                .to_url(base_url)
        });

        let previous = (self.page_number > 1).then(|| {
            let prev = self.page_number - 1;
            if prev == 1 {
                params.without(page_param).to_url(base_url)
            } else {
                params
                    .with_replaced(page_param, prev.to_string())
                    .to_url(base_url)
            }
        });

        PageResult {
            count: total,
            next,
            previous,
            offset,
            limit,
        }
    }
}

impl Default for PageDescriptor {
    fn default() -> Self {
        PageDescriptor {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Navigation data for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    /// Total matching records, before pagination.
    pub count: usize,
    /// Link to the next page, if any records follow this one.
    pub next: Option<String>,
    /// Link to the previous page, if this is not the first.
    pub previous: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

impl PageResult {
    /// The index range of this page within a slice of `len` records.
    pub fn window(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(len);
        let end = self.offset.saturating_add(self.limit).min(len);
        start..end
    }
}
