pub mod api;
pub mod builder;
pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod markdown;
pub mod page;
pub mod paths;
pub mod renderer;
pub mod template;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types
pub use api::{ApiClient, ContentSource, FetchError, PageQuery, Scope};
pub use builder::{BuildError, BuildReport, FailurePolicy, PageOutcome, SiteBuilder, SkipReason, Stage};
pub use collection::CollectionResolver;
pub use config::{RendererConfig, Status};
pub use context::RenderContext;
pub use error::{Error, Result};
pub use fetcher::ContentFetcher;
pub use page::{Page, PageType};
pub use paths::{PathPlan, PathPlanner};
pub use renderer::PagedataRenderer;
pub use template::{TemplateError, TemplateRenderer};
