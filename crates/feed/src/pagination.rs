//! Cursor-based pagination
//!
//! Pages are addressed by a timestamp cursor rather than an offset, which
//! stays stable under concurrent inserts: `older_than` walks backward
//! through history one page at a time, `newer_than` pulls everything that
//! arrived since the caller's top entry (a refresh), and an absent cursor
//! returns the first page.
//!
//! The paginator also decides whether a bounded cache window can be
//! trusted to answer a query, or whether the caller must fall back to the
//! authoritative store.

use plume_core::Timestamp;

/// Position marker for a page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// First page
    First,
    /// Entries strictly older than the timestamp (scrolling down)
    OlderThan(Timestamp),
    /// Entries strictly newer than the timestamp (refresh pull)
    NewerThan(Timestamp),
}

/// One page of results plus the has-more flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Entries in descending creation order
    pub results: Vec<T>,
    /// Whether more qualifying entries exist beyond this page
    pub has_next_page: bool,
}

/// Anything ordered by a creation timestamp
pub trait Chronological {
    /// Creation timestamp used for cursor comparisons
    fn created_at(&self) -> Timestamp;
}

/// Pages an ordered set by timestamp cursor
///
/// Input slices must already be sorted in descending creation order with a
/// stable tie-break (the authoritative tables and column-store scans both
/// guarantee this), so repeated pagination never duplicates or skips an
/// entry across pages under a static data set.
#[derive(Debug, Clone, Copy)]
pub struct CursorPaginator {
    page_size: usize,
}

impl CursorPaginator {
    /// Create a paginator returning `page_size` entries per page
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    /// Configured page size
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Page a descending-ordered slice
    ///
    /// `NewerThan` returns *all* strictly newer entries and never reports a
    /// next page: a refresh pull is not itself paged further forward — the
    /// caller re-issues with its new top cursor for subsequent refreshes.
    pub fn paginate<T: Clone + Chronological>(&self, entries: &[T], cursor: Cursor) -> Page<T> {
        match cursor {
            Cursor::NewerThan(ts) => {
                let results: Vec<T> = entries
                    .iter()
                    .take_while(|entry| entry.created_at() > ts)
                    .cloned()
                    .collect();
                Page {
                    results,
                    has_next_page: false,
                }
            }
            Cursor::OlderThan(ts) => {
                let qualifying: Vec<&T> = entries
                    .iter()
                    .filter(|entry| entry.created_at() < ts)
                    .collect();
                self.window(&qualifying)
            }
            Cursor::First => {
                let qualifying: Vec<&T> = entries.iter().collect();
                self.window(&qualifying)
            }
        }
    }

    /// Page a cached window, or report that the cache is insufficient
    ///
    /// `cache_capacity` is the bounded cache's configured capacity. Returns
    /// `None` when the cached window cannot be trusted to answer the query
    /// completely and the caller must re-query the authoritative store:
    /// a page that found no next entry while the cache sits exactly at
    /// capacity may be hiding a cache-induced truncation rather than a true
    /// end of data. A refresh pull and any page with a next page are always
    /// served from cache, as is any page against a cache shorter than
    /// capacity (such a cache holds the owner's full history).
    pub fn paginate_cached<T: Clone + Chronological>(
        &self,
        cached: &[T],
        cache_capacity: usize,
        cursor: Cursor,
    ) -> Option<Page<T>> {
        let page = self.paginate(cached, cursor);
        if matches!(cursor, Cursor::NewerThan(_)) {
            return Some(page);
        }
        if page.has_next_page {
            return Some(page);
        }
        if cached.len() < cache_capacity {
            return Some(page);
        }
        None
    }

    fn window<T: Clone>(&self, qualifying: &[&T]) -> Page<T> {
        let has_next_page = qualifying.len() > self.page_size;
        let results = qualifying
            .iter()
            .take(self.page_size)
            .map(|entry| (*entry).clone())
            .collect();
        Page {
            results,
            has_next_page,
        }
    }
}
