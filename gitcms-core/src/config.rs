use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_REFERENCE: &str = "main";

/// Where the content lives and how to reach it.
///
/// `token` is never (de)serialized; inject it from the environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    pub owner: String,
    pub repo: String,
    /// Folder to list when no explicit path is given.
    #[serde(default)]
    pub src_path: String,
    /// Branch, tag or tree sha that path resolution starts from.
    #[serde(default = "default_reference")]
    pub reference: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Upper bound on files enriched at once. `None` fans out to every file.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_reference() -> String {
    DEFAULT_REFERENCE.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl CmsConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            src_path: String::new(),
            reference: default_reference(),
            api_base_url: default_api_base_url(),
            max_concurrency: None,
            token: None,
        }
    }

    pub fn with_src_path(mut self, src_path: impl Into<String>) -> Self {
        self.src_path = src_path.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn trace_loaded(&self) {
        info!(
            owner = %self.owner,
            repo = %self.repo,
            src_path = %self.src_path,
            reference = %self.reference,
            token_set = self.token.is_some(),
            "Loaded CmsConfig"
        );
        debug!(?self, "CmsConfig loaded (full debug)");
    }
}

impl std::fmt::Debug for CmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("src_path", &self.src_path)
            .field("reference", &self.reference)
            .field("api_base_url", &self.api_base_url)
            .field("max_concurrency", &self.max_concurrency)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
