//! Paginated list requests and responses.

use api_client::{envelope, ApiError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page request for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    /// Page numbers start at 1; the size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn first(limit: u32) -> Self {
        Self::new(1, limit)
    }

    pub fn with_page(self, page: u32) -> Self {
        Self::new(page, self.limit)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of a server-side list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn empty(query: ListQuery) -> Self {
        Self {
            items: Vec::new(),
            page: query.page,
            limit: query.limit,
            total: 0,
            total_pages: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// `items.len() <= limit` and `total_pages == ceil(total / limit)`.
    pub fn is_consistent(&self) -> bool {
        self.limit > 0
            && self.items.len() <= self.limit as usize
            && self.total_pages == total_pages(self.total, self.limit)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

/// `ceil(total / limit)`; zero when `limit` is zero.
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationWire {
    page: Option<u32>,
    #[serde(alias = "pageSize")]
    limit: Option<u32>,
    #[serde(alias = "totalCount", alias = "totalItems", alias = "count")]
    total: Option<u64>,
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageWire<T> {
    #[serde(
        alias = "data",
        alias = "results",
        alias = "records",
        alias = "patients",
        alias = "doctors",
        alias = "tests",
        alias = "expenses",
        alias = "revenues",
        alias = "revenue",
        alias = "bills",
        alias = "orders"
    )]
    items: Vec<T>,
    pagination: Option<PaginationWire>,
    page: Option<u32>,
    #[serde(alias = "pageSize")]
    limit: Option<u32>,
    #[serde(alias = "totalCount", alias = "totalItems", alias = "count")]
    total: Option<u64>,
    total_pages: Option<u32>,
}

impl<T> PageWire<T> {
    fn into_page(self, query: ListQuery) -> Page<T> {
        let nested = self.pagination;
        let page = self
            .page
            .or_else(|| nested.as_ref().and_then(|p| p.page))
            .unwrap_or(query.page);
        let limit = self
            .limit
            .or_else(|| nested.as_ref().and_then(|p| p.limit))
            .filter(|l| *l > 0)
            .unwrap_or(query.limit);
        let total = self
            .total
            .or_else(|| nested.as_ref().and_then(|p| p.total))
            .unwrap_or(self.items.len() as u64);
        let total_pages = self
            .total_pages
            .or_else(|| nested.as_ref().and_then(|p| p.total_pages))
            .unwrap_or_else(|| total_pages(total, limit));

        Page {
            items: self.items,
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Decode a list response body into a [`Page`].
///
/// Paginated shapes are tried on every envelope level before falling back to
/// a bare array, so a nested `data.data` array never hides the pagination
/// block next to it.
///
/// # Errors
///
/// [`ApiError::Decode`] when no shape matches.
pub fn decode_page<T: DeserializeOwned>(endpoint: &str, body: &Value, query: ListQuery) -> Result<Page<T>, ApiError> {
    let candidates = envelope::candidates(body);
    let mut last_error = None;

    for candidate in &candidates {
        match PageWire::<T>::deserialize(*candidate) {
            Ok(wire) => return Ok(wire.into_page(query)),
            Err(e) => last_error = Some(e),
        }
    }

    for candidate in &candidates {
        if let Ok(items) = Vec::<T>::deserialize(*candidate) {
            let total = items.len() as u64;
            return Ok(Page {
                items,
                page: query.page,
                limit: query.limit,
                total,
                total_pages: total_pages(total, query.limit),
            });
        }
    }

    Err(ApiError::Decode {
        endpoint: endpoint.to_string(),
        reason: last_error.map_or_else(|| "empty response".to_string(), |e| e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: u32,
    }

    #[test]
    fn test_query_clamps() {
        assert_eq!(ListQuery::new(0, 0), ListQuery { page: 1, limit: 1 });
        assert_eq!(ListQuery::new(3, 500).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(100, 20), 5);
        assert_eq!(total_pages(101, 20), 6);
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_nested_pagination_block() {
        let body = json!({
            "success": true,
            "data": {
                "patients": [{"id": 1}, {"id": 2}],
                "pagination": {"page": 2, "limit": 2, "total": 5, "totalPages": 3}
            }
        });
        let page: Page<Row> = decode_page("/patients", &body, ListQuery::new(2, 2)).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.is_consistent());
        assert!(page.has_next());
        assert!(page.has_previous());
    }

    #[test]
    fn test_flat_pagination_fields_next_to_data() {
        let body = json!({"success": true, "data": [{"id": 1}], "total": 11, "page": 1, "limit": 10});
        let page: Page<Row> = decode_page("/doctors", &body, ListQuery::default()).unwrap();
        assert_eq!(page.total, 11);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_double_data_with_pagination_keeps_total() {
        let body = json!({"success": true, "data": {"data": [{"id": 1}], "total": 40, "totalPages": 4}});
        let page: Page<Row> = decode_page("/tests", &body, ListQuery::default()).unwrap();
        assert_eq!(page.total, 40);
        assert_eq!(page.total_pages, 4);
    }

    #[test]
    fn test_bare_array_fallback() {
        let body = json!([{"id": 1}, {"id": 2}, {"id": 3}]);
        let page: Page<Row> = decode_page("/tests", &body, ListQuery::new(1, 2)).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_unexpected_shape() {
        let body = json!({"success": true, "data": {"unexpected": "shape"}});
        assert!(decode_page::<Row>("/tests", &body, ListQuery::default()).is_err());
    }

    proptest! {
        #[test]
        fn prop_decoded_pages_are_consistent(total in 0u64..10_000, limit in 1u32..=100, page in 1u32..50) {
            let expected_pages = total_pages(total, limit);
            let remaining = total.saturating_sub(u64::from(page - 1) * u64::from(limit));
            let count = remaining.min(u64::from(limit));
            let rows: Vec<_> = (0..count).map(|i| json!({"id": i})).collect();
            let body = json!({"success": true, "data": {"items": rows, "pagination": {"page": page, "limit": limit, "total": total}}});

            let decoded: Page<Row> = decode_page("/x", &body, ListQuery::new(page, limit)).unwrap();

            prop_assert!(decoded.items.len() <= limit as usize);
            prop_assert_eq!(decoded.total_pages, expected_pages);
            prop_assert!(decoded.is_consistent());
        }
    }
}
