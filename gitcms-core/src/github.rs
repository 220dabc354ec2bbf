//! GitHub REST implementation of [`HostApi`].
//!
//! Endpoints used:
//! - `GET /repos/{owner}/{repo}/git/trees/{tree_sha}`
//! - `GET /repos/{owner}/{repo}/git/blobs/{file_sha}`
//! - `GET /repos/{owner}/{repo}/commits?path=&page=&per_page=`
//! - `GET /repos/{owner}/{repo}/contents/{path}?ref=`
//!
//! The base URL comes from [`CmsConfig::api_base_url`], so the client can be
//! pointed at a local mock server.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{ACCEPT, LINK};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::CmsConfig;
use crate::contract::{
    Blob, CommitPage, CommitSummary, EntryKind, FileContent, HostApi, PathContent, TreeEntry,
    TreeListing,
};
use crate::error::ApiError;
use crate::path::split_path;

const USER_AGENT: &str = concat!("gitcms/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    http: Client,
    base_url: String,
    owner: String,
    repo: String,
    reference: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &CmsConfig) -> Result<Self, ApiError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        info!(
            owner = %config.owner,
            repo = %config.repo,
            base_url = %config.api_base_url,
            token_set = config.token.is_some(),
            "Initialized GitHubClient"
        );
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            reference: config.reference.clone(),
            token: config.token.clone(),
        })
    }

    /// `{base}/repos/{owner}/{repo}/{segments...}` with each segment escaped.
    fn endpoint<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Result<Url, ApiError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?;
            path.pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str()])
                .extend(segments);
        }
        Ok(url)
    }

    fn request(&self, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| {
            error!(error = ?e, "Request to GitHub failed");
            ApiError::Http(e)
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        error!(status = %status, url = %url, "GitHub API returned error. Response body: {body}");
        Err(ApiError::Status {
            status: status.as_u16(),
            url,
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(url = %url, "GET");
        let response = self.send(self.request(url)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct WireTree {
    tree: Vec<WireTreeItem>,
}

#[derive(Deserialize)]
struct WireTreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    url: Option<String>,
}

impl From<WireTreeItem> for TreeEntry {
    fn from(item: WireTreeItem) -> Self {
        TreeEntry {
            kind: match item.kind.as_str() {
                "blob" => EntryKind::File,
                "tree" => EntryKind::Directory,
                _ => EntryKind::Other,
            },
            name: item.path,
            id: item.sha,
            byte_size: item.size.unwrap_or(0),
            url: item.url.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct WireBlob {
    content: String,
    encoding: String,
    size: u64,
    url: String,
}

#[derive(Deserialize)]
struct WireCommit {
    commit: WireCommitDetail,
}

#[derive(Deserialize)]
struct WireCommitDetail {
    author: Option<WireSignature>,
}

#[derive(Deserialize)]
struct WireSignature {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct WireContent {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl WireContent {
    fn into_entry(self) -> TreeEntry {
        TreeEntry {
            kind: match self.kind.as_str() {
                "file" => EntryKind::File,
                "dir" => EntryKind::Directory,
                _ => EntryKind::Other,
            },
            name: self.name,
            id: self.sha,
            byte_size: self.size,
            url: self.url,
        }
    }
}

/// Page number of the `rel="last"` entry of a `Link` header.
pub fn parse_last_page(link: &str) -> Option<u32> {
    static LAST: OnceLock<Regex> = OnceLock::new();
    let pattern = LAST.get_or_init(|| {
        Regex::new(r#"<([^>]+)>\s*;\s*rel="last""#).expect("static Link header pattern is valid")
    });
    let target = pattern.captures(link)?.get(1)?.as_str();
    let url = Url::parse(target).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

#[async_trait]
impl HostApi for GitHubClient {
    async fn get_tree_listing(&self, tree_id: &str) -> Result<TreeListing, ApiError> {
        let url = self.endpoint(["git", "trees", tree_id])?;
        let tree: WireTree = self.get_json(url).await?;
        Ok(TreeListing {
            entries: tree.tree.into_iter().map(TreeEntry::from).collect(),
        })
    }

    async fn get_blob(&self, blob_id: &str) -> Result<Blob, ApiError> {
        let url = self.endpoint(["git", "blobs", blob_id])?;
        let blob: WireBlob = self.get_json(url).await?;
        Ok(Blob {
            content: blob.content,
            encoding: blob.encoding,
            byte_size: blob.size,
            url: blob.url,
        })
    }

    async fn get_commit_history(
        &self,
        path: &str,
        page: u32,
        per_page: u32,
    ) -> Result<CommitPage, ApiError> {
        let url = self.endpoint(["commits"])?;
        let page_param = page.to_string();
        let per_page_param = per_page.to_string();
        let builder = self.request(url).query(&[
            ("path", path),
            ("page", page_param.as_str()),
            ("per_page", per_page_param.as_str()),
        ]);
        debug!(path, page, "GET commits");
        let response = self.send(builder).await?;
        let last_page = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_last_page);
        let commits: Vec<WireCommit> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(CommitPage {
            commits: commits
                .into_iter()
                .map(|c| {
                    let (author, date) = match c.commit.author {
                        Some(sig) => (sig.name, sig.date),
                        None => (None, None),
                    };
                    CommitSummary { date, author }
                })
                .collect(),
            last_page,
        })
    }

    async fn get_content_by_path(&self, path: &str) -> Result<PathContent, ApiError> {
        let mut url = self.endpoint(std::iter::once("contents").chain(split_path(path)))?;
        url.query_pairs_mut().append_pair("ref", &self.reference);
        let value: serde_json::Value = self.get_json(url).await?;

        if value.is_array() {
            let listing: Vec<WireContent> =
                serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
            return Ok(PathContent::Directory(
                listing.into_iter().map(WireContent::into_entry).collect(),
            ));
        }

        let file: WireContent =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(PathContent::File(FileContent {
            id: file.sha,
            path: file.path,
            byte_size: file.size,
            url: file.url,
            content: file.content,
            encoding: file.encoding,
            download_url: file.download_url,
        }))
    }

    async fn download(&self, url: &str) -> Result<String, ApiError> {
        let url = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
        debug!(url = %url, "GET raw");
        let mut builder = self.http.get(url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let response = self.send(builder).await?;
        response.text().await.map_err(ApiError::Http)
    }
}
