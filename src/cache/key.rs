//! Cache Key Module
//!
//! Deterministic key derivation: `namespace:category:param[:param...]`.

use std::borrow::Cow;
use std::fmt;

use crate::cache::PageQuery;

// == Key Category ==
/// Operation category a cached result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCategory {
    /// Point lookup by primary id
    ById,
    /// Point lookup by secondary key (e.g. card number)
    ByKey,
    /// Paginated listing of every record
    List,
    /// Paginated listing of records that are not trashed
    Active,
    /// Paginated listing of trashed records
    Trashed,
}

impl KeyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCategory::ById => "id",
            KeyCategory::ByKey => "key",
            KeyCategory::List => "list",
            KeyCategory::Active => "active",
            KeyCategory::Trashed => "trashed",
        }
    }
}

/// Which records a paginated listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListScope {
    All,
    Active,
    Trashed,
}

impl ListScope {
    pub fn category(&self) -> KeyCategory {
        match self {
            ListScope::All => KeyCategory::List,
            ListScope::Active => KeyCategory::Active,
            ListScope::Trashed => KeyCategory::Trashed,
        }
    }
}

// == Cache Key ==
/// A derived cache key.
///
/// Built only through the constructors below so that equal parameters always
/// yield the same string and distinct parameters never collide: every segment is
/// escaped (`%` → `%25`, `:` → `%3A`) before it is joined with `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of a point lookup by primary id.
    pub fn by_id(namespace: &str, id: impl fmt::Display) -> Self {
        Self::compose(namespace, KeyCategory::ById, &[id.to_string().as_str()])
    }

    /// Key of a point lookup by secondary key.
    pub fn by_key(namespace: &str, secondary: &str) -> Self {
        Self::compose(namespace, KeyCategory::ByKey, &[secondary])
    }

    /// Key of a paginated listing. Parameters are ordered page, page_size, search,
    /// taken from the normalized query.
    pub fn list(namespace: &str, scope: ListScope, query: &PageQuery) -> Self {
        let query = query.normalized();
        Self::compose(
            namespace,
            scope.category(),
            &[
                query.page.to_string().as_str(),
                query.page_size.to_string().as_str(),
                query.search.as_str(),
            ],
        )
    }

    fn compose(namespace: &str, category: KeyCategory, params: &[&str]) -> Self {
        let mut key = String::with_capacity(namespace.len() + 16);
        key.push_str(&escape_segment(namespace));
        key.push(':');
        key.push_str(category.as_str());
        for param in params {
            key.push(':');
            key.push_str(&escape_segment(param));
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn escape_segment(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['%', ':']) {
        return Cow::Borrowed(raw);
    }
    let mut escaped = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
