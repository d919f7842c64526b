//! Page-based query results.
//!
//! [`paginate`] reads one page from an [`OrderedQuery`] and counts the full
//! filtered set in a separate pass, producing an immutable [`PaginatedList`].

use async_trait::async_trait;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while paginating a query.
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("invalid pagination argument: {name} must be >= 1 (got {value})")]
    InvalidArgument { name: &'static str, value: u32 },
    #[error("paginated query failed: {0}")]
    Query(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// PageRequest
// ---------------------------------------------------------------------------

/// Validated page coordinates. Both values are 1-based and at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    /// # Errors
    ///
    /// Returns `PaginationError::InvalidArgument` if either value is 0.
    pub fn new(page_number: u32, page_size: u32) -> Result<Self, PaginationError> {
        if page_number < 1 {
            return Err(PaginationError::InvalidArgument {
                name: "page_number",
                value: page_number,
            });
        }
        if page_size < 1 {
            return Err(PaginationError::InvalidArgument {
                name: "page_size",
                value: page_size,
            });
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    #[must_use]
    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items preceding this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number - 1) * u64::from(self.page_size)
    }
}

// ---------------------------------------------------------------------------
// PaginatedList
// ---------------------------------------------------------------------------

/// One page of an ordered result set plus the totals of the whole set.
///
/// Serializes as
/// `{ items, pageNumber, totalPages, totalCount, hasPreviousPage, hasNextPage }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedList<T> {
    items: Vec<T>,
    page_number: u32,
    total_pages: u64,
    total_count: u64,
    has_previous_page: bool,
    has_next_page: bool,
    #[serde(skip)]
    page_size: u32,
}

impl<T> PaginatedList<T> {
    /// Builds a page from an already-sliced item list.
    ///
    /// Items beyond `page.page_size()` are dropped so the page never holds
    /// more than one page worth of data.
    #[must_use]
    pub fn new(mut items: Vec<T>, total_count: u64, page: PageRequest) -> Self {
        items.truncate(usize::try_from(page.page_size).unwrap_or(usize::MAX));
        let total_pages = total_count.div_ceil(u64::from(page.page_size));
        let page_number = page.page_number;
        Self {
            items,
            page_number,
            total_pages,
            total_count,
            has_previous_page: page_number > 1,
            has_next_page: u64::from(page_number) < total_pages,
            page_size: page.page_size,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    #[must_use]
    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.total_pages
    }

    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub const fn has_previous_page(&self) -> bool {
        self.has_previous_page
    }

    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    /// Converts every item (e.g. entity to DTO) while keeping the page totals.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> PaginatedList<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedList {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            total_pages: self.total_pages,
            total_count: self.total_count,
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
            page_size: self.page_size,
        }
    }
}

// ---------------------------------------------------------------------------
// OrderedQuery
// ---------------------------------------------------------------------------

/// A filtered query with a deterministic ordering.
///
/// Implementors must return items in the same order on every call; `fetch`
/// over an unordered source gives overlapping or missing items across pages.
/// `count` must apply the same filter as `fetch` but ignore offset and limit.
#[async_trait]
pub trait OrderedQuery: Send + Sync {
    type Item: Send;

    /// Number of items matching the filter.
    async fn count(&self) -> anyhow::Result<u64>;

    /// At most `limit` items starting at `offset`, in query order.
    async fn fetch(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<Self::Item>>;
}

/// Reads the requested page of `query`.
///
/// # Errors
///
/// Returns `PaginationError::Query` if either the count or the fetch pass fails.
pub async fn paginate<Q>(
    query: &Q,
    page: PageRequest,
) -> Result<PaginatedList<Q::Item>, PaginationError>
where
    Q: OrderedQuery + ?Sized,
{
    let total_count = query.count().await?;
    let items = if page.offset() >= total_count {
        Vec::new()
    } else {
        query.fetch(page.offset(), u64::from(page.page_size)).await?
    };
    tracing::trace!(
        page_number = page.page_number,
        page_size = page.page_size,
        total_count,
        returned = items.len(),
        "page read"
    );
    Ok(PaginatedList::new(items, total_count, page))
}

// ---------------------------------------------------------------------------
// VecQuery
// ---------------------------------------------------------------------------

type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// [`OrderedQuery`] over an in-memory vector that is already in query order.
pub struct VecQuery<T> {
    items: Vec<T>,
    filter: Option<Filter<T>>,
}

impl<T> VecQuery<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            filter: None,
        }
    }

    /// Restricts the query to items matching `predicate`.
    #[must_use]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matching(&self) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .filter(move |item| self.filter.as_ref().map_or(true, |f| f(item)))
    }
}

#[async_trait]
impl<T> OrderedQuery for VecQuery<T>
where
    T: Clone + Send + Sync,
{
    type Item = T;

    async fn count(&self) -> anyhow::Result<u64> {
        Ok(u64::try_from(self.matching().count())?)
    }

    async fn fetch(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<T>> {
        let offset = usize::try_from(offset)?;
        let limit = usize::try_from(limit)?;
        Ok(self.matching().skip(offset).take(limit).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn dataset(n: u32) -> VecQuery<u32> {
        VecQuery::new((1..=n).collect())
    }

    #[test]
    fn page_request_rejects_zero_values() {
        assert!(matches!(
            PageRequest::new(0, 10),
            Err(PaginationError::InvalidArgument { name: "page_number", value: 0 })
        ));
        assert!(matches!(
            PageRequest::new(1, 0),
            Err(PaginationError::InvalidArgument { name: "page_size", value: 0 })
        ));
    }

    #[tokio::test]
    async fn middle_page_of_twenty_five() {
        let page = paginate(&dataset(25), PageRequest::new(2, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.items(), (11..=20).collect::<Vec<_>>().as_slice());
        assert_eq!(page.total_count(), 25);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_previous_page());
        assert!(page.has_next_page());
    }

    #[tokio::test]
    async fn last_page_is_partial() {
        let page = paginate(&dataset(25), PageRequest::new(3, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.items().len(), 5);
        assert!(!page.has_next_page());
        assert!(page.has_previous_page());
    }

    #[tokio::test]
    async fn empty_set_has_zero_pages() {
        let page = paginate(&dataset(0), PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        assert!(page.items().is_empty());
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next_page());
        assert!(!page.has_previous_page());
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_but_keeps_totals() {
        let page = paginate(&dataset(25), PageRequest::new(7, 10).unwrap())
            .await
            .unwrap();
        assert!(page.items().is_empty());
        assert_eq!(page.total_count(), 25);
        assert_eq!(page.total_pages(), 3);
    }

    #[tokio::test]
    async fn count_uses_filter_not_page() {
        let query = dataset(25).filter(|n| n % 2 == 0);
        let page = paginate(&query, PageRequest::new(1, 5).unwrap())
            .await
            .unwrap();
        assert_eq!(page.items(), &[2, 4, 6, 8, 10]);
        assert_eq!(page.total_count(), 12);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn over_long_slice_is_truncated() {
        let page = PaginatedList::new(vec![1, 2, 3, 4], 4, PageRequest::new(1, 2).unwrap());
        assert_eq!(page.items(), &[1, 2]);
    }

    #[test]
    fn map_keeps_totals() {
        let page = PaginatedList::new(vec![1, 2], 9, PageRequest::new(2, 2).unwrap());
        let mapped = page.map(|n| n.to_string());
        assert_eq!(mapped.items(), &["1".to_string(), "2".to_string()]);
        assert_eq!(mapped.total_count(), 9);
        assert_eq!(mapped.total_pages(), 5);
        assert_eq!(mapped.page_number(), 2);
    }

    #[test]
    fn wire_shape_matches_contract() {
        let page = PaginatedList::new(vec!["a"], 3, PageRequest::new(2, 1).unwrap());
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({
                "items": ["a"],
                "pageNumber": 2,
                "totalPages": 3,
                "totalCount": 3,
                "hasPreviousPage": true,
                "hasNextPage": true
            })
        );
    }

    proptest! {
        #[test]
        fn totals_are_consistent(total in 0u64..10_000, page_number in 1u32..200, page_size in 1u32..100) {
            let page = PaginatedList::<u8>::new(Vec::new(), total, PageRequest::new(page_number, page_size).unwrap());
            let size = u64::from(page_size);
            prop_assert_eq!(page.total_pages(), (total + size - 1) / size);
            prop_assert_eq!(page.has_next_page(), u64::from(page_number) < page.total_pages());
            prop_assert_eq!(page.has_previous_page(), page_number > 1);
        }
    }
}
