//! Page Query Module
//!
//! Pagination parameters of list reads. They are part of every list cache key,
//! so their canonical form lives next to the key derivation.

use serde::{Deserialize, Serialize};

/// Page size used when the caller sends none (or zero)
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page, page size and search term of a list read
///
/// # Fields
/// - `page`: 1-based page number
/// - `page_size`: Records per page
/// - `search`: Free-text filter on the card number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub search: String,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl PageQuery {
    pub fn new(page: u32, page_size: u32, search: impl Into<String>) -> Self {
        Self {
            page,
            page_size,
            search: search.into(),
        }
    }

    /// Returns the canonical form of the query.
    ///
    /// Page 0 becomes 1, page size 0 becomes the default, oversized pages are
    /// clamped and surrounding whitespace is dropped from the search term.
    pub fn normalized(&self) -> Self {
        let page_size = match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_PAGE_SIZE),
        };
        Self {
            page: self.page.max(1),
            page_size,
            search: self.search.trim().to_string(),
        }
    }

    /// Number of records to skip. Expects a normalized query.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE, "")
    }
}
