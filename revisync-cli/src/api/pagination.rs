//! Cursor pagination used by every listing call

use serde::{Deserialize, Serialize};
use std::future::Future;

use super::error::{ApiError, ApiResult};

/// Default page size for listing calls
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Request for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub first: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl PageRequest {
    pub fn first(first: usize) -> Self {
        Self { first, after: None }
    }

    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.after = cursor;
        self
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

/// One page of a listing: `{ edges: [{node}], pageInfo, totalCount }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    pub total_count: usize,
}

impl<T> Page<T> {
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

/// Fetch every page of a listing, one request at a time
///
/// `fetch_page` receives the request for the next page. `on_page` is called
/// after each page with `(fetched_so_far, total_count)`.
pub async fn fetch_all<T, F, Fut>(
    page_size: usize,
    mut fetch_page: F,
    mut on_page: impl FnMut(usize, usize),
) -> ApiResult<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = ApiResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let request = PageRequest::first(page_size.max(1)).after(cursor.clone());
        let page = fetch_page(request).await?;

        let total = page.total_count;
        let info = page.page_info.clone();
        items.extend(page.into_nodes());
        on_page(items.len(), total.max(items.len()));

        if !info.has_next_page {
            break;
        }

        match info.end_cursor {
            Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                return Err(ApiError::Protocol(format!(
                    "page repeats endCursor '{}' while reporting hasNextPage",
                    next
                )));
            }
            Some(next) => cursor = Some(next),
            None => {
                return Err(ApiError::Protocol(
                    "page reports hasNextPage without an endCursor".to_string(),
                ));
            }
        }
    }

    Ok(items)
}
