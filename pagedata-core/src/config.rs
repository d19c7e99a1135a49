use std::{collections::BTreeMap, fmt, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = concat!("pagedata/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
}

/// Which version of the content the API should hand back.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    #[default]
    Published,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Published => "published",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renderer settings. Built once and only read afterwards.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
    /// Base URL of the content API
    pub host: String,
    pub api_key: String,
    pub user_agent: String,
    /// Directory template includes are resolved against
    pub template_root: PathBuf,
    pub status: Status,
    /// Shared fragments merged into every render, as context name -> slug
    pub common: BTreeMap<String, String>,
    pub template_extension: String,
    /// Per-request timeout for the content API
    pub timeout_secs: u64,
    /// Upper bound on pages built at once
    pub concurrency: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8081".to_string(),
            api_key: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            template_root: PathBuf::from("./templates"),
            status: Status::default(),
            common: BTreeMap::new(),
            template_extension: "html".to_string(),
            timeout_secs: 30,
            concurrency: 16,
        }
    }
}

impl RendererConfig {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Concurrency as used by the site builder; zero is treated as one.
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
