use std::collections::{BTreeMap, HashSet};
use std::error::Error as _;
use std::io;
use std::path::{Path, PathBuf};

use tera::{Template, Tera};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::context::RenderContext;
use crate::markdown::MarkdownFilter;

/// File extensions picked up by the include loader, besides the configured one.
const LOADER_EXTENSIONS: &[&str] = &["html", "htm", "xml", "njk", "tera", "txt"];

/// Name prefix for a rendered template that lives outside the root.
const OUTSIDE_ROOT_PREFIX: &str = "__page__";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render template {}: {message}", path.display())]
    Render { path: PathBuf, message: String },
}

impl TemplateError {
    /// True when the template file itself does not exist.
    pub fn is_missing_template(&self) -> bool {
        matches!(self, TemplateError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Compiles and renders one template file per call.
///
/// Includes and `extends` resolve against `root`, whatever directory the
/// rendered template lives in. A root template that does not compile only
/// fails the renders that reference it. Nothing is cached between calls and
/// edits are picked up on the next render.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    root: PathBuf,
    extension: String,
}

impl TemplateRenderer {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: "html".to_string(),
        }
    }

    pub fn extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render the template at `template_path` with `context`.
    pub async fn render(
        &self,
        template_path: &Path,
        context: &RenderContext,
    ) -> Result<String, TemplateError> {
        let source = tokio::fs::read_to_string(template_path).await.map_err(|source| {
            TemplateError::Read { path: template_path.to_path_buf(), source }
        })?;

        let renderer = self.clone();
        let path = template_path.to_path_buf();
        let context = context.to_tera();
        tokio::task::spawn_blocking(move || renderer.render_source(&path, &source, &context))
            .await
            .map_err(|e| TemplateError::Render {
                path: template_path.to_path_buf(),
                message: format!("render task failed: {e}"),
            })?
    }

    /// Compile `source` as if it were the file at `path` and render it.
    pub fn render_source(
        &self,
        path: &Path,
        source: &str,
        context: &tera::Context,
    ) -> Result<String, TemplateError> {
        let name = self.template_name(path);
        debug!("Rendering {} as '{}'", path.display(), name);

        let mut root = self.load_root(&name);
        let mut templates = std::mem::take(&mut root.loaded);
        templates.push((name.clone(), source.to_string()));

        let render_error = |e: tera::Error| TemplateError::Render {
            path: path.to_path_buf(),
            message: root.explain(describe(&e)),
        };

        let mut tera = Tera::default();
        tera.register_filter("markdown", MarkdownFilter);
        tera.add_raw_templates(templates).map_err(render_error)?;
        tera.render(&name, context).map_err(render_error)
    }

    /// Root-relative, `/`-separated name. Templates outside the root get a
    /// prefixed absolute name so they never shadow a root template.
    fn template_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).ok().map(Path::to_path_buf).or_else(|| {
            let root = std::fs::canonicalize(&self.root).ok()?;
            let path = std::fs::canonicalize(path).ok()?;
            path.strip_prefix(root).ok().map(Path::to_path_buf)
        });

        match relative {
            Some(relative) => to_template_name(&relative),
            None => format!("{OUTSIDE_ROOT_PREFIX}{}", path.display()),
        }
    }

    /// Every loadable template under the root except `page`.
    ///
    /// Each file is parsed on its own first. Files that fail to parse, or that
    /// extend or import a template which is not loaded, are left out so they
    /// only break renders that reference them.
    fn load_root(&self, page: &str) -> RootTemplates {
        let mut root = RootTemplates::default();
        if !self.root.is_dir() {
            return root;
        }

        let mut candidates = Vec::new();
        let files = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_loadable(e.path()));
        for entry in files {
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = to_template_name(relative);
            if name == page {
                continue;
            }
            let text = match std::fs::read_to_string(entry.path()) {
                Ok(text) => text,
                Err(e) => {
                    debug!("Skipping unreadable template {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            match Template::new(&name, None, &text) {
                Ok(parsed) => {
                    let requires: Vec<String> = parsed
                        .parent
                        .into_iter()
                        .chain(parsed.imported_macro_files.into_iter().map(|(file, _)| file))
                        .collect();
                    candidates.push((name, text, requires));
                }
                Err(e) => root.exclude(name, describe(&e)),
            }
        }

        // Drop templates whose load-time dependencies are gone, until stable.
        loop {
            let present: HashSet<&str> = candidates
                .iter()
                .map(|(name, _, _)| name.as_str())
                .chain(std::iter::once(page))
                .collect();
            let broken: Vec<(usize, String)> = candidates
                .iter()
                .enumerate()
                .filter_map(|(i, (_, _, requires))| {
                    let missing = requires.iter().find(|r| !present.contains(r.as_str()))?;
                    Some((i, missing.clone()))
                })
                .collect();
            if broken.is_empty() {
                break;
            }
            for (i, missing) in broken.into_iter().rev() {
                let (name, _, _) = candidates.remove(i);
                root.exclude(name, format!("depends on '{missing}', which is not loaded"));
            }
        }

        root.loaded = candidates.into_iter().map(|(name, text, _)| (name, text)).collect();
        root
    }

    fn is_loadable(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .map(|ext| ext == self.extension.as_str() || LOADER_EXTENSIONS.contains(&&*ext))
            .unwrap_or(false)
    }
}

/// Templates under the root that will be compiled with a page, and the ones
/// that were left out along with why.
#[derive(Default)]
struct RootTemplates {
    loaded: Vec<(String, String)>,
    excluded: BTreeMap<String, String>,
}

impl RootTemplates {
    fn exclude(&mut self, name: String, reason: String) {
        debug!("Not loading template '{}': {}", name, reason);
        self.excluded.insert(name, reason);
    }

    /// Append the reason behind any excluded template the message names.
    fn explain(&self, mut message: String) -> String {
        let causes: Vec<String> = self
            .excluded
            .iter()
            .filter(|(name, _)| message.contains(&format!("'{name}'")))
            .map(|(name, reason)| format!("'{name}' was not loaded: {reason}"))
            .collect();
        for cause in causes {
            message.push_str("; ");
            message.push_str(&cause);
        }
        message
    }
}

fn to_template_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Tera nests the useful part of a message in its source chain.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
