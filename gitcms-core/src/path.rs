//! Repository path helpers and path → tree handle resolution.
//!
//! The host has no direct path lookup for trees, so a path is resolved one
//! segment at a time by listing each parent tree.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::contract::{EntryKind, HostApi};
use crate::error::CmsError;

/// Split a slash-delimited path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Join a prefix and a name with `/`, normalising away empty segments.
pub fn join_path(prefix: &str, name: &str) -> String {
    let mut segments = split_path(prefix);
    segments.extend(split_path(name));
    segments.join("/")
}

/// Resolve `path` to the id of the tree it names, starting from `start`.
///
/// Every segment costs one tree listing and depends on the previous one, so
/// this runs strictly in sequence. An empty path resolves to `start`.
pub async fn resolve_path<H>(api: &H, path: &str, start: &str) -> Result<String, CmsError>
where
    H: HostApi + ?Sized,
{
    let mut handle = start.to_string();
    for segment in split_path(path) {
        let listing = api.get_tree_listing(&handle).await?;
        let found = listing
            .entries
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::Directory)
            .find(|entry| entry.name == segment)
            .map(|entry| entry.id)
            .filter(|id| !id.is_empty());

        match found {
            Some(id) => {
                debug!(segment, tree_id = %id, "Resolved path segment");
                handle = id;
            }
            None => {
                error!(path, segment, "Path segment did not resolve to a directory");
                return Err(CmsError::PathNotFound {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
    }
    Ok(handle)
}

/// Posix-style decomposition of a file path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParts {
    pub dir: String,
    /// Base name without extension.
    pub name: String,
    /// Extension including the leading dot, or empty.
    pub ext: String,
}

impl PathParts {
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        let (dir, base) = match trimmed.rfind('/') {
            Some(0) => ("/", &trimmed[1..]),
            Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
            None => ("", trimmed),
        };
        // a leading dot marks a hidden file, not an extension
        let (name, ext) = match base.rfind('.') {
            Some(idx) if idx > 0 => (&base[..idx], &base[idx..]),
            _ => (base, ""),
        };
        Self {
            dir: dir.to_string(),
            name: name.to_string(),
            ext: ext.to_string(),
        }
    }
}
