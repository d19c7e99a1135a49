use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::api::{ApiClient, ContentSource, FetchError, Scope};
use crate::builder::{BuildError, BuildReport, FailurePolicy, SiteBuilder};
use crate::collection::CollectionResolver;
use crate::config::RendererConfig;
use crate::context::RenderContext;
use crate::error::Result;
use crate::fetcher::{CONTENT_KEY, ContentFetcher};
use crate::template::TemplateRenderer;

/// Entry point for rendering content API pages.
///
/// Every fetch made through one renderer uses the status from its config.
pub struct PagedataRenderer<C = ApiClient> {
    config: Arc<RendererConfig>,
    fetcher: ContentFetcher<C>,
    resolver: CollectionResolver<C>,
    templates: TemplateRenderer,
    policy: FailurePolicy,
}

impl PagedataRenderer<ApiClient> {
    /// Renderer backed by the HTTP content API described in `config`.
    pub fn connect(config: RendererConfig) -> Result<Self, FetchError> {
        let client = ApiClient::new(&config)?;
        Ok(Self::with_source(config, Arc::new(client)))
    }
}

impl<C: ContentSource> PagedataRenderer<C> {
    pub fn with_source(config: RendererConfig, source: Arc<C>) -> Self {
        let fetcher = ContentFetcher::new(Arc::clone(&source), config.status, config.common.clone());
        let resolver = CollectionResolver::new(source, config.status);
        let templates =
            TemplateRenderer::new(&config.template_root).extension(config.template_extension.as_str());

        Self {
            config: Arc::new(config),
            fetcher,
            resolver,
            templates,
            policy: FailurePolicy::default(),
        }
    }

    /// Failure policy used by [`build_site`](Self::build_site).
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub async fn render_template(&self, template_path: &Path, context: &RenderContext) -> Result<String> {
        Ok(self.templates.render(template_path, context).await?)
    }

    /// Render one page, with the common fragments, through `template_path`.
    pub async fn render_page(&self, slug: &str, template_path: &Path) -> Result<String> {
        let context = self.fetcher.resolve(Some(slug)).await?;
        self.render_template(template_path, &context).await
    }

    /// Render every child of `parent_slug` through `template_path`, keyed by
    /// slug. Collection children are rendered like any other page. The first
    /// error aborts the whole call.
    pub async fn render_collection(
        &self,
        parent_slug: &str,
        template_path: &Path,
    ) -> Result<BTreeMap<String, String>> {
        let (children, common) = futures::try_join!(
            self.resolver.resolve_children(Scope::Parent(parent_slug.to_string())),
            self.fetcher.resolve(None),
        )?;
        debug!("Rendering {} child page(s) of '{}'", children.len(), parent_slug);

        let common = &common;
        let rendered = try_join_all(children.into_iter().map(|page| async move {
            let context = common.merged_with(RenderContext::new().with(CONTENT_KEY, page.content));
            let html = self.render_template(template_path, &context).await?;
            Ok::<_, crate::Error>((page.slug, html))
        }))
        .await?;

        Ok(rendered.into_iter().collect())
    }

    /// Build every page of `project_slug` into `output_root`; see [`SiteBuilder`].
    pub async fn build_site<T: AsRef<Path>, O: AsRef<Path>>(
        &self,
        project_slug: &str,
        template_root: T,
        output_root: O,
    ) -> Result<BuildReport, BuildError> {
        SiteBuilder::new(&self.fetcher, &self.resolver)
            .policy(self.policy)
            .concurrency(self.config.concurrency())
            .template_extension(self.config.template_extension.as_str())
            .build(project_slug, template_root, output_root)
            .await
    }
}
