use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use pagedata_core::{FailurePolicy, RendererConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "./pagedata.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PagedataConfig {
    /// Build configuration
    pub build: BuildConfig,
    /// Content API and template settings (from pagedata-core)
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Output directory for generated site
    pub output: String,
    /// Stop the build at the first failed page
    pub fail_fast: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: "./out".to_string(),
            fail_fast: false,
        }
    }
}

impl BuildConfig {
    pub fn policy(&self) -> FailurePolicy {
        if self.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::CollectErrors
        }
    }
}

/// CLI flag id -> configuration key
const OVERRIDES: &[(&str, &str)] = &[
    ("host", "renderer.host"),
    ("api_key", "renderer.api_key"),
    ("status", "renderer.status"),
    ("templates", "renderer.template_root"),
    ("concurrency", "renderer.concurrency"),
    ("output", "build.output"),
];

impl PagedataConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (PAGEDATA_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = string_arg(args, "config")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        builder = builder.add_source(ConfigBuilder::try_from(&Self::default())?);

        // 2. Add configuration file if it exists
        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::from(Path::new(&config_file)));
        }

        // 3. Add environment variables with PAGEDATA_ prefix
        builder = builder.add_source(
            Environment::with_prefix("PAGEDATA")
                .prefix_separator("_")
                .separator("__"), // Use double underscore for nested keys
        );

        // 4. Override with CLI arguments that are defined for this command
        for (id, key) in OVERRIDES {
            if let Some(value) = string_arg(args, id) {
                builder = builder.set_override(*key, value.as_str())?;
            }
        }
        if args.try_get_one::<bool>("fail_fast").ok().flatten().copied().unwrap_or(false) {
            builder = builder.set_override("build.fail_fast", true)?;
        }

        let config: PagedataConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

fn string_arg<'a>(args: &'a ArgMatches, id: &str) -> Option<&'a String> {
    args.try_get_one::<String>(id).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};
    use pagedata_core::Status;
    use std::path::PathBuf;

    fn command() -> Command {
        Command::new("test")
            .arg(Arg::new("config").long("config").value_name("FILE"))
            .arg(Arg::new("host").long("host"))
            .arg(Arg::new("status").long("status"))
            .arg(Arg::new("output").long("output").value_name("DIR"))
            .arg(Arg::new("concurrency").long("concurrency"))
            .arg(Arg::new("fail_fast").long("fail-fast").action(ArgAction::SetTrue))
    }

    #[test]
    fn test_default_config() {
        let config = PagedataConfig::default();
        assert_eq!(config.build.output, "./out");
        assert_eq!(config.build.policy(), FailurePolicy::CollectErrors);
        assert_eq!(config.renderer.status, Status::Published);
    }

    #[test]
    fn test_cli_args_override() {
        let matches = command()
            .try_get_matches_from(vec![
                "test",
                "--config", "/does/not/exist.toml",
                "--host", "https://cms.example.com",
                "--status", "draft",
                "--output", "/custom/output",
                "--concurrency", "4",
                "--fail-fast",
            ])
            .unwrap();

        let config = PagedataConfig::load(&matches).unwrap();
        assert_eq!(config.renderer.host, "https://cms.example.com");
        assert_eq!(config.renderer.status, Status::Draft);
        assert_eq!(config.renderer.concurrency, 4);
        assert_eq!(config.build.output, "/custom/output");
        assert_eq!(config.build.policy(), FailurePolicy::FailFast);
        // Should still have defaults for non-overridden values
        assert_eq!(config.renderer.template_root, PathBuf::from("./templates"));
    }

    #[test]
    fn test_file_then_cli() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pagedata.toml");
        std::fs::write(
            &path,
            r#"
            [build]
            output = "./public"

            [renderer]
            host = "https://file.example.com"
            api_key = "from-file"

            [renderer.common]
            header = "site-header"
            "#,
        )
        .unwrap();

        let matches = command()
            .try_get_matches_from(vec![
                "test",
                "--config", path.to_str().unwrap(),
                "--host", "https://cli.example.com",
            ])
            .unwrap();

        let config = PagedataConfig::load(&matches).unwrap();
        assert_eq!(config.renderer.host, "https://cli.example.com");
        assert_eq!(config.renderer.api_key, "from-file");
        assert_eq!(config.renderer.common.get("header").map(String::as_str), Some("site-header"));
        assert_eq!(config.build.output, "./public");
    }
}
