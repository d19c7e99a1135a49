use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::api::{ContentSource, FetchError};
use crate::config::Status;
use crate::context::RenderContext;

/// Context key the primary page's content is stored under.
pub const CONTENT_KEY: &str = "content";

/// Resolves a page plus the configured common fragments into one context.
pub struct ContentFetcher<C> {
    source: Arc<C>,
    status: Status,
    common: BTreeMap<String, String>,
}

impl<C> Clone for ContentFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            status: self.status,
            common: self.common.clone(),
        }
    }
}

impl<C: ContentSource> ContentFetcher<C> {
    pub fn new(source: Arc<C>, status: Status, common: BTreeMap<String, String>) -> Self {
        Self { source, status, common }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn common(&self) -> &BTreeMap<String, String> {
        &self.common
    }

    /// Fetch every common fragment, plus `page_slug` as `content` when
    /// given, concurrently.
    ///
    /// Stops at the first failed fetch; anything still in flight is dropped.
    pub async fn resolve(&self, page_slug: Option<&str>) -> Result<RenderContext, FetchError> {
        let mut work: Vec<(&str, &str)> = self
            .common
            .iter()
            .map(|(name, slug)| (name.as_str(), slug.as_str()))
            .collect();
        if let Some(slug) = page_slug {
            work.push((CONTENT_KEY, slug));
        }

        debug!("Resolving {} slug(s) with status {}", work.len(), self.status);

        let resolved = try_join_all(work.into_iter().map(|(name, slug)| async move {
            let page = self.source.get_page(slug, self.status).await?;
            Ok::<_, FetchError>((name.to_string(), page.content))
        }))
        .await?;

        Ok(resolved.into_iter().collect())
    }
}
