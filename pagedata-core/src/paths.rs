use std::path::{Path, PathBuf};

/// Suffix that marks a project's homepage slug, e.g. `acme-homepage`.
pub const HOMEPAGE_SUFFIX: &str = "homepage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPlan {
    /// Template the page is rendered with
    pub input_path: PathBuf,
    /// Where the rendered HTML goes
    pub output_path: PathBuf,
}

impl PathPlan {
    pub fn output_dir(&self) -> &Path {
        self.output_path.parent().unwrap_or(Path::new(""))
    }
}

/// Maps page slugs onto template and output locations.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    template_root: PathBuf,
    output_root: PathBuf,
    extension: String,
}

impl PathPlanner {
    pub fn new<T: AsRef<Path>, O: AsRef<Path>>(template_root: T, output_root: O) -> Self {
        Self {
            template_root: template_root.as_ref().to_path_buf(),
            output_root: output_root.as_ref().to_path_buf(),
            extension: "html".to_string(),
        }
    }

    pub fn extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into();
        self
    }

    /// Homepage goes to `<output>/index.html`, everything else to
    /// `<output>/<slug without project prefix>/index.html`. Slugs are not
    /// validated.
    pub fn plan(&self, project_slug: &str, page_slug: &str) -> PathPlan {
        let root = project_relative(project_slug, page_slug);
        let input_path = self.template_root.join(format!("{root}.{}", self.extension));

        let output_path = if page_slug == homepage_slug(project_slug) {
            self.output_root.join("index.html")
        } else {
            self.output_root.join(root).join("index.html")
        };

        PathPlan { input_path, output_path }
    }
}

pub fn homepage_slug(project_slug: &str) -> String {
    format!("{project_slug}-{HOMEPAGE_SUFFIX}")
}

/// `page_slug` with the `<project>-` prefix removed, if present.
pub fn project_relative<'a>(project_slug: &str, page_slug: &'a str) -> &'a str {
    page_slug
        .strip_prefix(project_slug)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(page_slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> PathPlanner {
        PathPlanner::new("/site/templates", "/site/out")
    }

    #[test]
    fn test_homepage_maps_to_root_index() {
        let plan = planner().plan("acme", "acme-homepage");
        assert_eq!(plan.input_path, PathBuf::from("/site/templates/homepage.html"));
        assert_eq!(plan.output_path, PathBuf::from("/site/out/index.html"));
        assert_eq!(plan.output_dir(), Path::new("/site/out"));
    }

    #[test]
    fn test_page_maps_to_subdirectory() {
        let plan = planner().plan("acme", "acme-page-one");
        assert_eq!(plan.input_path, PathBuf::from("/site/templates/page-one.html"));
        assert_eq!(plan.output_path, PathBuf::from("/site/out/page-one/index.html"));
    }

    #[test]
    fn test_slug_without_project_prefix_is_kept() {
        let plan = planner().plan("acme", "other-about");
        assert_eq!(plan.output_path, PathBuf::from("/site/out/other-about/index.html"));
    }

    #[test]
    fn test_prefix_needs_separator() {
        assert_eq!(project_relative("acme", "acmecorp-about"), "acmecorp-about");
        assert_eq!(project_relative("acme", "acme-about"), "about");
    }

    #[test]
    fn test_homepage_of_other_project_is_not_root() {
        let plan = planner().plan("acme", "beta-homepage");
        assert_eq!(plan.output_path, PathBuf::from("/site/out/beta-homepage/index.html"));
    }

    #[test]
    fn test_custom_extension() {
        let plan = planner().extension("njk").plan("acme", "acme-blog");
        assert_eq!(plan.input_path, PathBuf::from("/site/templates/blog.njk"));
    }
}
