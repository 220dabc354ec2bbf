//! Coordinating module for the resolve → traverse → flatten → enrich → sort
//! pipeline.

use std::marker::PhantomData;

use futures::future::try_join_all;
use futures::{stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::config::CmsConfig;
use crate::contract::{HostApi, PathContent};
use crate::encoding::decode_content;
use crate::error::CmsError;
use crate::frontmatter::{self, FrontmatterValidator};
use crate::github::GitHubClient;
use crate::path::resolve_path;
use crate::record::{sort_records, ContentRecord, SortField};
use crate::revision::{resolve_dates, RevisionPair};
use crate::tree::{build_tree, flatten, EntryFilter, FileDescriptor};

/// Options for [`GitCms::list_items`].
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// File name suffixes to keep, e.g. `.md`.
    pub extensions: Vec<String>,
    /// Folder to list; the configured `src_path` when `None`.
    pub path: Option<String>,
    pub recursive: bool,
    pub include_content: bool,
    pub ascending: bool,
    pub sort_by: SortField,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".md".to_string()],
            path: None,
            recursive: false,
            include_content: true,
            ascending: false,
            sort_by: SortField::Created,
        }
    }
}

/// Lists and fetches documents from a repository host.
///
/// `FM` is the front-matter type each record carries; metadata is validated
/// against the optional schema first and then deserialized into `FM`.
pub struct GitCms<H, FM = Map<String, Value>> {
    api: H,
    config: CmsConfig,
    validator: Option<FrontmatterValidator>,
    _frontmatter: PhantomData<fn() -> FM>,
}

impl<FM> GitCms<GitHubClient, FM>
where
    FM: DeserializeOwned + Send,
{
    /// Build a client for GitHub from `config`, validating front-matter
    /// against `schema` when given.
    pub fn from_config(config: CmsConfig, schema: Option<&Value>) -> Result<Self, CmsError> {
        config.trace_loaded();
        let api = GitHubClient::new(&config)?;
        let cms = Self::new(api, config);
        match schema {
            Some(schema) => cms.with_schema(schema),
            None => Ok(cms),
        }
    }
}

impl<H, FM> GitCms<H, FM>
where
    H: HostApi,
    FM: DeserializeOwned + Send,
{
    pub fn new(api: H, config: CmsConfig) -> Self {
        Self {
            api,
            config,
            validator: None,
            _frontmatter: PhantomData,
        }
    }

    /// Compile `schema` once; every listed item is validated against it.
    pub fn with_schema(mut self, schema: &Value) -> Result<Self, CmsError> {
        self.validator = Some(FrontmatterValidator::compile(schema)?);
        Ok(self)
    }

    pub fn config(&self) -> &CmsConfig {
        &self.config
    }

    /// List every matching document under a folder, enriched and sorted.
    ///
    /// Any failure, in any tree level or any single document, fails the whole
    /// call.
    pub async fn list_items(&self, options: ListOptions) -> Result<Vec<ContentRecord<FM>>, CmsError> {
        let path = options
            .path
            .clone()
            .unwrap_or_else(|| self.config.src_path.clone());
        info!(
            path = %path,
            recursive = options.recursive,
            extensions = ?options.extensions,
            "Listing items"
        );

        let tree_id = resolve_path(&self.api, &path, &self.config.reference).await?;
        let filter = EntryFilter::new(options.extensions.clone(), options.recursive);
        let tree = build_tree(&self.api, &tree_id, &filter).await?;
        let files = flatten(&tree, &path);
        info!(files = files.len(), tree_id = %tree_id, "Flattened tree");

        let enrich = files
            .into_iter()
            .map(|file| self.enrich(file, options.include_content));
        let mut records: Vec<ContentRecord<FM>> = match self.config.max_concurrency {
            Some(limit) => {
                stream::iter(enrich)
                    .buffered(limit.max(1))
                    .try_collect::<Vec<_>>()
                    .await?
            }
            None => try_join_all(enrich).await?,
        };

        sort_records(&mut records, options.sort_by, options.ascending);
        info!(records = records.len(), sort_by = ?options.sort_by, "Listed items");
        Ok(records)
    }

    /// Fetch a single document by blob id, without traversal.
    ///
    /// A blob id carries no path, so path parts are empty and no dates are
    /// resolved.
    pub async fn get_item_by_id(&self, id: &str) -> Result<ContentRecord<FM>, CmsError> {
        info!(id, "Fetching item by id");
        let blob = self.api.get_blob(id).await?;
        let text = decode_content(&blob.content, &blob.encoding).map_err(|source| {
            error!(id, error = %source, "Failed to decode blob");
            CmsError::Decode {
                id: id.to_string(),
                source,
            }
        })?;
        let file = FileDescriptor {
            full_path: String::new(),
            file_name: String::new(),
            id: id.to_string(),
            byte_size: blob.byte_size,
            content_url: blob.url,
        };
        self.build_record(file, &text, RevisionPair::default(), self.validator.as_ref(), true)
    }

    /// Fetch a single document by repository path, validating against
    /// `schema` instead of the configured one when given.
    pub async fn get_item_by_path(
        &self,
        path: &str,
        schema: Option<&Value>,
    ) -> Result<ContentRecord<FM>, CmsError> {
        info!(path, "Fetching item by path");
        let override_validator = schema.map(FrontmatterValidator::compile).transpose()?;
        let validator = override_validator.as_ref().or(self.validator.as_ref());

        let file = match self.api.get_content_by_path(path).await? {
            PathContent::File(file) => file,
            PathContent::Directory(entries) => {
                error!(path, entries = entries.len(), "Expected a file, got a directory listing");
                return Err(CmsError::UnexpectedResponseShape {
                    path: path.to_string(),
                    reason: "path resolves to a directory listing".to_string(),
                });
            }
        };

        // "none" marks content too large to inline
        let inline = file
            .content
            .as_deref()
            .filter(|_| file.encoding.as_deref() != Some("none"));
        let text = match (inline, file.download_url.as_deref()) {
            (Some(content), _) => {
                let encoding = file.encoding.as_deref().unwrap_or("base64");
                decode_content(content, encoding).map_err(|source| CmsError::Decode {
                    id: file.id.clone(),
                    source,
                })?
            }
            (None, Some(download_url)) => {
                debug!(path, download_url, "Content not inlined, downloading");
                self.api.download(download_url).await?
            }
            (None, None) => {
                error!(path, "File has neither inline content nor a download URL");
                return Err(CmsError::UnexpectedResponseShape {
                    path: path.to_string(),
                    reason: "file has neither inline content nor a download URL".to_string(),
                });
            }
        };

        let full_path = if file.path.is_empty() {
            path.trim_matches('/').to_string()
        } else {
            file.path.clone()
        };
        let dates = resolve_dates(&self.api, &full_path).await?;
        let descriptor = FileDescriptor {
            file_name: full_path.rsplit('/').next().unwrap_or_default().to_string(),
            full_path,
            id: file.id,
            byte_size: file.byte_size,
            content_url: file.url,
        };
        self.build_record(descriptor, &text, dates, validator, true)
    }

    /// Decoded text of a blob, without any enrichment.
    pub async fn get_raw_content(&self, id: &str) -> Result<String, CmsError> {
        let blob = self.api.get_blob(id).await?;
        decode_content(&blob.content, &blob.encoding).map_err(|source| CmsError::Decode {
            id: id.to_string(),
            source,
        })
    }

    async fn enrich(&self, file: FileDescriptor, include_content: bool) -> Result<ContentRecord<FM>, CmsError> {
        debug!(path = %file.full_path, id = %file.id, "Enriching file");
        let blob = self.api.get_blob(&file.id).await?;
        let text = decode_content(&blob.content, &blob.encoding).map_err(|source| {
            error!(path = %file.full_path, error = %source, "Failed to decode blob");
            CmsError::Decode {
                id: file.id.clone(),
                source,
            }
        })?;
        let dates = resolve_dates(&self.api, &file.full_path).await?;
        self.build_record(file, &text, dates, self.validator.as_ref(), include_content)
    }

    fn build_record(
        &self,
        file: FileDescriptor,
        text: &str,
        dates: RevisionPair,
        validator: Option<&FrontmatterValidator>,
        include_content: bool,
    ) -> Result<ContentRecord<FM>, CmsError> {
        let parsed = frontmatter::process(&file.full_path, text, validator)?;
        let frontmatter: FM = serde_json::from_value(Value::Object(parsed.metadata)).map_err(|source| {
            error!(path = %file.full_path, error = %source, "Front-matter does not fit the record type");
            CmsError::FrontmatterType {
                path: file.full_path.clone(),
                source,
            }
        })?;
        Ok(ContentRecord::assemble(
            file,
            dates,
            frontmatter,
            parsed.body,
            include_content,
        ))
    }
}
