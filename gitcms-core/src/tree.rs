//! In-memory repository trees: traversal from a tree handle and flattening
//! into a list of matched files.

use std::collections::BTreeMap;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde::Serialize;
use tracing::debug;

use crate::contract::{EntryKind, HostApi, TreeEntry};
use crate::error::CmsError;
use crate::path::{join_path, split_path};

/// A node of a traversed tree.
///
/// `children` is `Some` only for directories that have been traversed. Child
/// names are unique within a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    pub byte_size: u64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, TreeNode>>,
}

impl TreeNode {
    /// Synthetic root for the tree identified by `id`.
    pub fn root(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: EntryKind::Directory,
            byte_size: 0,
            url: String::new(),
            children: None,
        }
    }

    fn from_entry(entry: TreeEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            kind: entry.kind,
            byte_size: entry.byte_size,
            url: entry.url,
            children: None,
        }
    }
}

/// Which entries of a listing are kept during traversal.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    pub extensions: Vec<String>,
    pub recursive: bool,
}

impl EntryFilter {
    pub fn new(extensions: Vec<String>, recursive: bool) -> Self {
        Self {
            extensions,
            recursive,
        }
    }

    /// Files with an accepted extension always pass; directories only when
    /// recursing.
    pub fn accepts(&self, entry: &TreeEntry) -> bool {
        match entry.kind {
            EntryKind::File => self
                .extensions
                .iter()
                .any(|ext| entry.name.ends_with(ext.as_str())),
            EntryKind::Directory => self.recursive,
            EntryKind::Other => false,
        }
    }
}

/// Fetch and assemble the tree rooted at `tree_id`.
pub async fn build_tree<H>(api: &H, tree_id: &str, filter: &EntryFilter) -> Result<TreeNode, CmsError>
where
    H: HostApi + ?Sized,
{
    let mut root = TreeNode::root(tree_id);
    root.children = Some(traverse(api, tree_id.to_string(), filter).await?);
    Ok(root)
}

/// Children of one tree level, with every kept directory traversed in turn.
///
/// Sibling subtrees are fetched concurrently; the level completes only once
/// all of them have, and the first failure fails the whole traversal.
pub fn traverse<'a, H>(
    api: &'a H,
    tree_id: String,
    filter: &'a EntryFilter,
) -> BoxFuture<'a, Result<BTreeMap<String, TreeNode>, CmsError>>
where
    H: HostApi + ?Sized,
{
    async move {
        let listing = api.get_tree_listing(&tree_id).await?;
        let kept: Vec<TreeEntry> = listing
            .entries
            .into_iter()
            .filter(|entry| filter.accepts(entry))
            .collect();
        debug!(tree_id = %tree_id, kept = kept.len(), "Fetched tree level");

        let nodes = try_join_all(kept.into_iter().map(|entry| async move {
            let mut node = TreeNode::from_entry(entry);
            if node.kind == EntryKind::Directory {
                node.children = Some(traverse(api, node.id.clone(), filter).await?);
            }
            Ok::<_, CmsError>(node)
        }))
        .await?;

        Ok(nodes
            .into_iter()
            .map(|node| (node.name.clone(), node))
            .collect())
    }
    .boxed()
}

/// A matched leaf file with its full repository path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub full_path: String,
    pub file_name: String,
    pub id: String,
    pub byte_size: u64,
    pub content_url: String,
}

/// Flatten a traversed tree into one descriptor per file leaf, in traversal
/// order. Paths are `prefix` joined with every ancestor name and the leaf name.
pub fn flatten(tree: &TreeNode, prefix: &str) -> Vec<FileDescriptor> {
    let mut files = Vec::new();
    collect_files(tree, &split_path(prefix).join("/"), &mut files);
    files
}

fn collect_files(node: &TreeNode, prefix: &str, files: &mut Vec<FileDescriptor>) {
    for child in node.children.iter().flat_map(|children| children.values()) {
        let full_path = join_path(prefix, &child.name);
        if child.children.is_some() {
            collect_files(child, &full_path, files);
        } else if child.kind == EntryKind::File {
            files.push(FileDescriptor {
                full_path,
                file_name: child.name.clone(),
                id: child.id.clone(),
                byte_size: child.byte_size,
                content_url: child.url.clone(),
            });
        }
    }
}
