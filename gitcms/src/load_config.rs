//! Loads a static YAML config file and injects the secrets it must not contain.
//!
//! The file carries repository coordinates plus an optional path to a JSON
//! schema for front-matter; the API token comes from `GITHUB_TOKEN`.
//!
//! ```yaml
//! owner: jbukuts
//! repo: blog
//! src_path: /content/posts
//! reference: main          # optional
//! max_concurrency: 8       # optional
//! schema: ./post.schema.json  # optional, relative to this file
//! ```
//!
//! All errors are `anyhow::Error` and surface at the CLI boundary.

use anyhow::{anyhow, Result};
use gitcms_core::CmsConfig;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// YAML-side shape of the config file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(flatten)]
    cms: CmsConfig,
    #[serde(default)]
    schema: Option<PathBuf>,
}

/// Everything the CLI needs to build a `GitCms`.
#[derive(Debug)]
pub struct CliConfig {
    pub cms: CmsConfig,
    pub schema: Option<Value>,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let mut cms = raw.cms;
    cms.token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty());
    if cms.token.is_none() {
        info!("{TOKEN_ENV} not set, using unauthenticated requests");
    }

    let schema = match raw.schema {
        Some(schema_path) => {
            let base = path_ref.parent().unwrap_or_else(|| Path::new("."));
            Some(load_schema(&base.join(schema_path))?)
        }
        None => None,
    };

    Ok(CliConfig { cms, schema })
}

fn load_schema(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, schema_path = ?path, "Failed to read schema file");
        anyhow!("Failed to read schema file {:?}: {}", path, e)
    })?;
    let schema = serde_json::from_str(&content).map_err(|e| {
        error!(error = ?e, schema_path = ?path, "Failed to parse schema JSON");
        anyhow!("Failed to parse schema JSON {:?}: {}", path, e)
    })?;
    info!(schema_path = ?path, "Loaded front-matter schema");
    Ok(schema)
}
