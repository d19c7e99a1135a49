//! Test helpers, enabled with the `test-utils` feature.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::StatusCode;

use crate::api::{ContentSource, FetchError, PageQuery, Scope};
use crate::config::Status;
use crate::page::Page;

/// A request seen by [`MemorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Page { slug: String, status: Status },
    Pages(PageQuery),
}

impl Request {
    pub fn status(&self) -> Status {
        match self {
            Request::Page { status, .. } => *status,
            Request::Pages(query) => query.status,
        }
    }
}

/// In-memory content store that records every request it serves.
///
/// Project listings match pages whose slug starts with `<project>-`;
/// parent listings match on `parent_page_slug`. Unknown slugs answer 404.
#[derive(Debug, Default)]
pub struct MemorySource {
    pages: Vec<Page>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    requests: Mutex<Vec<Request>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    pub fn with_pages<I: IntoIterator<Item = Page>>(mut self, pages: I) -> Self {
        self.pages.extend(pages);
        self
    }

    /// Hold back the answer for `slug` (a page slug or listing scope slug).
    pub fn with_delay<S: Into<String>>(mut self, slug: S, delay: Duration) -> Self {
        self.delays.insert(slug.into(), delay);
        self
    }

    /// Answer HTTP 500 for `slug` (a page slug or listing scope slug).
    pub fn failing<S: Into<String>>(mut self, slug: S) -> Self {
        self.failing.insert(slug.into());
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn requested_slugs(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Page { slug, .. } => Some(slug),
                Request::Pages(_) => None,
            })
            .collect()
    }

    pub fn queries(&self) -> Vec<PageQuery> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Pages(query) => Some(query),
                Request::Page { .. } => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.requests().iter().map(Request::status).collect()
    }

    fn record(&self, request: Request) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }

    async fn wait(&self, slug: &str) {
        if let Some(delay) = self.delays.get(slug) {
            tokio::time::sleep(*delay).await;
        }
    }
}

impl ContentSource for MemorySource {
    async fn get_page(&self, slug: &str, status: Status) -> Result<Page, FetchError> {
        self.record(Request::Page { slug: slug.to_string(), status });
        self.wait(slug).await;

        let target = format!("pages/{slug}");
        if self.failing.contains(slug) {
            return Err(FetchError::Status { target, status: StatusCode::INTERNAL_SERVER_ERROR });
        }
        self.pages
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or(FetchError::Status { target, status: StatusCode::NOT_FOUND })
    }

    async fn get_pages(&self, query: &PageQuery) -> Result<Vec<Page>, FetchError> {
        self.record(Request::Pages(query.clone()));
        let scope_slug = match &query.scope {
            Scope::Parent(slug) | Scope::Project(slug) => slug.as_str(),
        };
        self.wait(scope_slug).await;

        if self.failing.contains(scope_slug) {
            return Err(FetchError::Status {
                target: query.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }

        let prefix = format!("{scope_slug}-");
        Ok(self
            .pages
            .iter()
            .filter(|page| match &query.scope {
                Scope::Parent(parent) => page.parent_page_slug.as_deref() == Some(parent),
                Scope::Project(_) => page.slug.starts_with(&prefix),
            })
            .cloned()
            .collect())
    }
}
