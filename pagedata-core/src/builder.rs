//! Whole-project static builds.
//!
//! A build lists every page of a project in one request, resolves the common
//! fragments once, then runs each page through
//! plan -> ensure directory -> render -> write independently of the others.
//! Pages without a template are skipped, and collection pages are never
//! rendered on their own.

use std::fmt;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ContentSource, FetchError, Scope};
use crate::collection::CollectionResolver;
use crate::context::RenderContext;
use crate::error::Error;
use crate::fetcher::{CONTENT_KEY, ContentFetcher};
use crate::page::Page;
use crate::paths::{PathPlan, PathPlanner};
use crate::template::TemplateRenderer;

/// What a build does when a page fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Build every page and report every outcome
    #[default]
    CollectErrors,
    /// Stop at the first failed page
    FailFast,
}

/// Where in the per-page pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Directory,
    Render,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Directory => write!(f, "creating its directory"),
            Stage::Render => write!(f, "rendering"),
            Stage::Write => write!(f, "writing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Listing pages are not rendered as leaves
    Collection,
    /// No template has been written for the page yet
    MissingTemplate,
}

#[derive(Debug)]
pub enum PageOutcome {
    Written { slug: String, path: PathBuf },
    Skipped { slug: String, reason: SkipReason },
    Failed { slug: String, stage: Stage, error: Error },
}

impl PageOutcome {
    pub fn slug(&self) -> &str {
        match self {
            PageOutcome::Written { slug, .. }
            | PageOutcome::Skipped { slug, .. }
            | PageOutcome::Failed { slug, .. } => slug,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PageOutcome::Failed { .. })
    }
}

/// Per-page outcomes of a build, in the order the API listed the pages.
#[derive(Debug)]
pub struct BuildReport {
    pub project: String,
    pub outcomes: Vec<PageOutcome>,
}

impl BuildReport {
    pub fn written(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.outcomes.iter().filter_map(|o| match o {
            PageOutcome::Written { slug, path } => Some((slug.as_str(), path.as_path())),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            PageOutcome::Skipped { slug, reason } => Some((slug.as_str(), *reason)),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &PageOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn into_result(self) -> Result<Self, BuildError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BuildError::Incomplete(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to load content for project '{project}': {source}")]
    Fetch {
        project: String,
        #[source]
        source: FetchError,
    },
    #[error("page '{slug}' failed while {stage}: {source}")]
    Page {
        slug: String,
        stage: Stage,
        #[source]
        source: Error,
    },
    #[error("{} of {} page(s) failed to build", .0.failures().count(), .0.outcomes.len())]
    Incomplete(BuildReport),
}

pub struct SiteBuilder<'a, C> {
    fetcher: &'a ContentFetcher<C>,
    resolver: &'a CollectionResolver<C>,
    policy: FailurePolicy,
    concurrency: usize,
    extension: String,
}

impl<'a, C: ContentSource> SiteBuilder<'a, C> {
    pub fn new(fetcher: &'a ContentFetcher<C>, resolver: &'a CollectionResolver<C>) -> Self {
        Self {
            fetcher,
            resolver,
            policy: FailurePolicy::default(),
            concurrency: 16,
            extension: "html".to_string(),
        }
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn template_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into();
        self
    }

    /// Build every page of `project_slug` into `output_root`.
    ///
    /// Failing to list the project or to resolve the common fragments is
    /// fatal. Page failures are reported in the returned [`BuildReport`]
    /// unless the policy is [`FailurePolicy::FailFast`].
    pub async fn build<T: AsRef<Path>, O: AsRef<Path>>(
        &self,
        project_slug: &str,
        template_root: T,
        output_root: O,
    ) -> Result<BuildReport, BuildError> {
        let template_root = template_root.as_ref();
        let planner = PathPlanner::new(template_root, output_root).extension(self.extension.as_str());
        let templates = TemplateRenderer::new(template_root).extension(self.extension.as_str());

        info!("Building project '{}'", project_slug);

        let (pages, common) = futures::try_join!(
            self.resolver.resolve_children(Scope::Project(project_slug.to_string())),
            self.fetcher.resolve(None),
        )
        .map_err(|source| BuildError::Fetch { project: project_slug.to_string(), source })?;

        let total = pages.len();
        let (planner, templates, common) = (&planner, &templates, &common);
        let mut work = stream::iter(pages.into_iter().enumerate())
            .map(|(index, page)| async move {
                let outcome = self.build_page(project_slug, page, planner, templates, common).await;
                (index, outcome)
            })
            .buffer_unordered(self.concurrency);

        let mut outcomes = Vec::with_capacity(total);
        while let Some((index, outcome)) = work.next().await {
            let outcome = match outcome {
                PageOutcome::Failed { slug, stage, error } => {
                    warn!("Page '{}' failed while {}: {}", slug, stage, error);
                    if self.policy == FailurePolicy::FailFast {
                        return Err(BuildError::Page { slug, stage, source: error });
                    }
                    PageOutcome::Failed { slug, stage, error }
                }
                other => other,
            };
            outcomes.push((index, outcome));
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let report = BuildReport {
            project: project_slug.to_string(),
            outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        };
        info!(
            "Built project '{}': {} written, {} skipped, {} failed",
            project_slug,
            report.written().count(),
            report.skipped().count(),
            report.failures().count()
        );
        Ok(report)
    }

    async fn build_page(
        &self,
        project_slug: &str,
        page: Page,
        planner: &PathPlanner,
        templates: &TemplateRenderer,
        common: &RenderContext,
    ) -> PageOutcome {
        let slug = page.slug.clone();
        if page.is_collection() {
            debug!("Skipping collection page '{}'", slug);
            return PageOutcome::Skipped { slug, reason: SkipReason::Collection };
        }

        let plan = planner.plan(project_slug, &slug);
        match tokio::fs::try_exists(&plan.input_path).await {
            Ok(true) => {}
            Ok(false) => return missing_template(slug, &plan),
            // Anything but absence surfaces when the template is read.
            Err(e) => debug!("Could not stat template {}: {}", plan.input_path.display(), e),
        }

        let dir = plan.output_dir();
        if let Err(source) = tokio::fs::create_dir_all(dir).await {
            let error = Error::Dir { path: dir.to_path_buf(), source };
            return PageOutcome::Failed { slug, stage: Stage::Directory, error };
        }

        let context = common.merged_with(
            RenderContext::new()
                .with(CONTENT_KEY, page.content)
                .with("pageSlug", slug.as_str())
                .with("projectSlug", project_slug),
        );

        let html = match templates.render(&plan.input_path, &context).await {
            Ok(html) => html,
            // Removed between the existence check and the read.
            Err(e) if e.is_missing_template() => return missing_template(slug, &plan),
            Err(e) => return PageOutcome::Failed { slug, stage: Stage::Render, error: e.into() },
        };

        if let Err(source) = tokio::fs::write(&plan.output_path, html).await {
            let error = Error::Write { path: plan.output_path, source };
            return PageOutcome::Failed { slug, stage: Stage::Write, error };
        }

        info!("Wrote {} -> {}", slug, plan.output_path.display());
        PageOutcome::Written { slug, path: plan.output_path }
    }
}

fn missing_template(slug: String, plan: &PathPlan) -> PageOutcome {
    warn!("No template for page '{}' at {}, skipping", slug, plan.input_path.display());
    PageOutcome::Skipped { slug, reason: SkipReason::MissingTemplate }
}
