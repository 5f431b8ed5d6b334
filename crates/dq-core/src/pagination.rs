//! # Pagination
//!
//! `page`/`take` → `offset`/`limit` before the read, total count → page
//! metadata after it. Pure integer arithmetic.

use serde::{Deserialize, Serialize};

use crate::engine::Window;

/// Page size used when none is configured.
pub const DEFAULT_TAKE: u64 = 100;

/// Default and maximum page size of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLimits {
    default_take: u64,
    max_take: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(DEFAULT_TAKE, DEFAULT_TAKE)
    }
}

impl PageLimits {
    /// A zero default falls back to [`DEFAULT_TAKE`]; a maximum below the
    /// default is raised to it.
    pub fn new(default_take: u64, max_take: u64) -> Self {
        let default_take = if default_take == 0 {
            DEFAULT_TAKE
        } else {
            default_take
        };
        Self {
            default_take,
            max_take: max_take.max(default_take),
        }
    }

    pub fn default_take(&self) -> u64 {
        self.default_take
    }

    pub fn max_take(&self) -> u64 {
        self.max_take
    }

    /// Clamp a requested page. Negative pages become 0; a take that is
    /// absent, not positive, or above the maximum becomes the default.
    pub fn page(&self, page: Option<i64>, take: Option<i64>) -> Page {
        let page = page.and_then(|p| u64::try_from(p).ok()).unwrap_or(0);
        let take = take
            .and_then(|t| u64::try_from(t).ok())
            .filter(|t| *t > 0 && *t <= self.max_take)
            .unwrap_or(self.default_take);
        Page { page, take }
    }

    /// Same as [`page`](Self::page) for raw query-string values; values that
    /// are not integers count as absent.
    pub fn page_from_params(&self, page: Option<&str>, take: Option<&str>) -> Page {
        let int = |raw: Option<&str>| raw.and_then(|s| s.trim().parse::<i64>().ok());
        self.page(int(page), int(take))
    }
}

/// A validated page request. `take` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    page: u64,
    take: u64,
}

impl Page {
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn take(&self) -> u64 {
        self.take
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.take)
    }

    pub fn window(&self) -> Window {
        Window {
            limit: self.take,
            offset: self.offset(),
        }
    }

    /// Metadata for a read that returned `item_count` rows out of `total`.
    pub fn meta(&self, item_count: usize, total: u64) -> PageMeta {
        let page_count = total.div_ceil(self.take);
        PageMeta {
            page: self.page,
            take: self.take,
            item_count: item_count as u64,
            page_count,
            has_previous_page: self.page > 0,
            has_next_page: self.page.saturating_add(1) < page_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub take: u64,
    pub item_count: u64,
    pub page_count: u64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}
