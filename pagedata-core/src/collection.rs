use std::sync::Arc;

use tracing::debug;

use crate::api::{ContentSource, FetchError, PageQuery, Scope};
use crate::config::Status;
use crate::page::Page;

/// Lists pages with their content populated, in one request.
pub struct CollectionResolver<C> {
    source: Arc<C>,
    status: Status,
}

impl<C> Clone for CollectionResolver<C> {
    fn clone(&self) -> Self {
        Self { source: Arc::clone(&self.source), status: self.status }
    }
}

impl<C: ContentSource> CollectionResolver<C> {
    pub fn new(source: Arc<C>, status: Status) -> Self {
        Self { source, status }
    }

    /// Pages under `scope`, in the order the API returned them.
    pub async fn resolve_children(&self, scope: Scope) -> Result<Vec<Page>, FetchError> {
        let query = PageQuery::new(scope, self.status);
        let pages = self.source.get_pages(&query).await?;
        debug!("{} returned {} page(s)", query, pages.len());
        Ok(pages)
    }
}
