//! Cursor pagination over MCP list operations.

use std::future::Future;

use tracing::debug;

use crate::error::McpResult;
use crate::messages::Paginated;

/// Fetch pages until the server stops returning a cursor.
///
/// `fetch` receives `None` for the first page and the previous page's
/// `nextCursor` afterwards. A missing or empty cursor ends the loop. Items
/// are returned in server order; the first failing page aborts the whole
/// listing.
pub async fn collect_pages<P, F, Fut>(mut fetch: F) -> McpResult<Vec<P::Item>>
where
    P: Paginated,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = McpResult<P>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.take()).await?;
        pages += 1;

        let (batch, next) = page.into_page();
        items.extend(batch);

        match next {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
    }

    debug!(pages, items = items.len(), "Pagination complete");
    Ok(items)
}
