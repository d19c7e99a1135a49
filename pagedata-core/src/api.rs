//! Content API access.
//!
//! Everything that talks to the content store goes through [`ContentSource`].
//! [`ApiClient`] is the HTTP implementation; tests drive the pipeline with an
//! in-memory source instead.

use std::fmt;
use std::future::Future;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use crate::config::{RendererConfig, Status};
use crate::page::Page;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid content API host '{host}': {message}")]
    InvalidHost { host: String, message: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request for {target} failed: {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request for {target} timed out")]
    Timeout { target: String },
    #[error("request for {target} returned HTTP {status}")]
    Status { target: String, status: StatusCode },
    #[error("invalid response for {target}: {source}")]
    Decode {
        target: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// The slug or query the failed request was for, if one was issued.
    pub fn target(&self) -> Option<&str> {
        match self {
            FetchError::InvalidHost { .. } | FetchError::Client(_) => None,
            FetchError::Transport { target, .. }
            | FetchError::Timeout { target }
            | FetchError::Status { target, .. }
            | FetchError::Decode { target, .. } => Some(target),
        }
    }

    fn from_request(target: String, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout { target }
        } else {
            FetchError::Transport { target, source }
        }
    }
}

/// Which pages a listing request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Direct children of a page
    Parent(String),
    /// Every page in a project
    Project(String),
}

impl Scope {
    fn param(&self) -> (&'static str, &str) {
        match self {
            Scope::Parent(slug) => ("parentPageSlug", slug),
            Scope::Project(slug) => ("projectSlug", slug),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (key, slug) = self.param();
        write!(f, "{key}={slug}")
    }
}

/// A listing request. Content is always populated in the same round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub scope: Scope,
    pub status: Status,
}

impl PageQuery {
    pub fn new(scope: Scope, status: Status) -> Self {
        Self { scope, status }
    }
}

impl fmt::Display for PageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pages?{}&populate=content&status={}", self.scope, self.status)
    }
}

pub trait ContentSource: Send + Sync {
    fn get_page(
        &self,
        slug: &str,
        status: Status,
    ) -> impl Future<Output = Result<Page, FetchError>> + Send;

    fn get_pages(
        &self,
        query: &PageQuery,
    ) -> impl Future<Output = Result<Vec<Page>, FetchError>> + Send;
}

/// HTTP client for the content API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    api_key: String,
}

impl ApiClient {
    pub fn new(config: &RendererConfig) -> Result<Self, FetchError> {
        let base = Url::parse(&config.host).map_err(|e| FetchError::InvalidHost {
            host: config.host.clone(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidHost {
                host: config.host.clone(),
                message: "URL cannot be used as a base".to_string(),
            });
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            base,
            api_key: config.api_key.clone(),
        })
    }

    /// `<host>/pages[/<slug>]`, keeping any path prefix of the host.
    fn pages_url(&self, slug: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("pages");
            if let Some(slug) = slug {
                segments.push(slug);
            }
        }
        url
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        if self.api_key.is_empty() {
            request
        } else {
            request.header(API_KEY_HEADER, &self.api_key)
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        target: String,
        request: RequestBuilder,
    ) -> Result<T, FetchError> {
        debug!("Fetching {}", target);
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_request(target.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { target, status });
        }

        response.json::<T>().await.map_err(|source| {
            if source.is_timeout() {
                FetchError::Timeout { target }
            } else {
                FetchError::Decode { target, source }
            }
        })
    }
}

impl ContentSource for ApiClient {
    async fn get_page(&self, slug: &str, status: Status) -> Result<Page, FetchError> {
        let request = self
            .get(self.pages_url(Some(slug)))
            .query(&[("status", status.as_str())]);
        self.send(format!("pages/{slug}"), request).await
    }

    async fn get_pages(&self, query: &PageQuery) -> Result<Vec<Page>, FetchError> {
        let (scope_key, scope_slug) = query.scope.param();
        let request = self.get(self.pages_url(None)).query(&[
            (scope_key, scope_slug),
            ("populate", "content"),
            ("status", query.status.as_str()),
        ]);
        self.send(query.to_string(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(host: &str) -> ApiClient {
        let config = RendererConfig { host: host.to_string(), ..Default::default() };
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_page_url_encodes_slug() {
        let url = client("http://localhost:8081").pages_url(Some("acme about"));
        assert_eq!(url.as_str(), "http://localhost:8081/pages/acme%20about");
    }

    #[test]
    fn test_page_url_keeps_host_prefix() {
        let url = client("https://cms.example.com/api/v1/").pages_url(None);
        assert_eq!(url.as_str(), "https://cms.example.com/api/v1/pages");
    }

    #[test]
    fn test_invalid_host() {
        let config = RendererConfig { host: "not a url".to_string(), ..Default::default() };
        let err = ApiClient::new(&config).unwrap_err();
        assert!(matches!(err, FetchError::InvalidHost { .. }));
        assert!(err.target().is_none());
    }

    #[test]
    fn test_query_display() {
        let query = PageQuery::new(Scope::Project("acme".into()), Status::Draft);
        assert_eq!(query.to_string(), "pages?projectSlug=acme&populate=content&status=draft");
    }
}
