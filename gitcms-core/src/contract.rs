//! # contract: read-only interface to the content host
//!
//! This module defines the single trait ([`HostApi`]) the pipeline consumes and
//! the plain data types that cross it. The pipeline never talks HTTP directly;
//! [`crate::github::GitHubClient`] is the production implementation and
//! `MockHostApi` (generated by `mockall`) is used in tests.
//!
//! ## Capabilities
//! - one level of a tree listing, no recursion or filtering
//! - a blob by id
//! - one page of commit history for an exact path, plus the last-page pointer
//! - a single file (or directory listing) by path
//! - raw text behind a download URL
//!
//! Implementations return [`ApiError`] and must not retry; the pipeline
//! propagates failures as they are.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

pub use crate::error::ApiError;

/// Page size used for commit history requests.
pub const COMMITS_PER_PAGE: u32 = 100;

/// Kind of an entry inside a tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    /// Submodules, symlinks and anything else the pipeline never descends into.
    Other,
}

/// One entry of a single-level tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub id: String,
    pub kind: EntryKind,
    pub byte_size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct TreeListing {
    pub entries: Vec<TreeEntry>,
}

/// Stored content of a single file, still transport-encoded.
#[derive(Debug, Clone)]
pub struct Blob {
    pub content: String,
    pub encoding: String,
    pub byte_size: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub date: Option<DateTime<Utc>>,
    pub author: Option<String>,
}

/// One page of commit history, most recent first.
#[derive(Debug, Clone, Default)]
pub struct CommitPage {
    pub commits: Vec<CommitSummary>,
    /// Page number of the last page, when the host reports more than one.
    pub last_page: Option<u32>,
}

/// A single file fetched by path.
#[derive(Debug, Clone, Default)]
pub struct FileContent {
    pub id: String,
    /// Path as resolved by the host.
    pub path: String,
    pub byte_size: u64,
    pub url: String,
    pub content: Option<String>,
    pub encoding: Option<String>,
    pub download_url: Option<String>,
}

/// What a by-path lookup resolved to.
#[derive(Debug, Clone)]
pub enum PathContent {
    File(FileContent),
    Directory(Vec<TreeEntry>),
}

/// Read-only access to a content-addressed repository host.
///
/// The trait is `Send + Sync` so a single client can serve every concurrent
/// branch of a traversal.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HostApi: Send + Sync {
    /// List the immediate children of a tree (directory snapshot).
    async fn get_tree_listing(&self, tree_id: &str) -> Result<TreeListing, ApiError>;

    /// Fetch a blob (file snapshot) by id.
    async fn get_blob(&self, blob_id: &str) -> Result<Blob, ApiError>;

    /// Fetch one page of commits touching exactly `path`.
    async fn get_commit_history(
        &self,
        path: &str,
        page: u32,
        per_page: u32,
    ) -> Result<CommitPage, ApiError>;

    /// Fetch a file (or the listing of a directory) by repository path.
    async fn get_content_by_path(&self, path: &str) -> Result<PathContent, ApiError>;

    /// Fetch raw text from a download URL returned by [`HostApi::get_content_by_path`].
    async fn download(&self, url: &str) -> Result<String, ApiError>;
}
