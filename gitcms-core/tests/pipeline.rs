use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use gitcms_core::contract::{
    ApiError, Blob, CommitPage, CommitSummary, EntryKind, HostApi, PathContent, TreeEntry,
    TreeListing,
};
use gitcms_core::{CmsConfig, CmsError, GitCms, ListOptions, SortField};

/// In-memory repository host. Commit history is paginated the way the real
/// host does it, so the two-request date lookup is exercised.
#[derive(Default)]
struct FixtureHost {
    trees: HashMap<String, Vec<TreeEntry>>,
    blobs: HashMap<String, Blob>,
    history: HashMap<String, Vec<DateTime<Utc>>>,
    commit_requests: Arc<AtomicUsize>,
}

impl FixtureHost {
    fn tree(mut self, id: &str, entries: Vec<TreeEntry>) -> Self {
        self.trees.insert(id.to_string(), entries);
        self
    }

    fn blob(mut self, id: &str, text: &str) -> Self {
        self.blobs.insert(
            id.to_string(),
            Blob {
                content: STANDARD.encode(text),
                encoding: "base64".into(),
                byte_size: text.len() as u64,
                url: format!("https://fixture.test/blobs/{id}"),
            },
        );
        self
    }

    fn history(mut self, path: &str, newest_first: Vec<DateTime<Utc>>) -> Self {
        self.history.insert(path.to_string(), newest_first);
        self
    }
}

#[async_trait]
impl HostApi for FixtureHost {
    async fn get_tree_listing(&self, tree_id: &str) -> Result<TreeListing, ApiError> {
        self.trees
            .get(tree_id)
            .map(|entries| TreeListing {
                entries: entries.clone(),
            })
            .ok_or_else(|| not_found(tree_id))
    }

    async fn get_blob(&self, blob_id: &str) -> Result<Blob, ApiError> {
        self.blobs.get(blob_id).cloned().ok_or_else(|| not_found(blob_id))
    }

    async fn get_commit_history(
        &self,
        path: &str,
        page: u32,
        per_page: u32,
    ) -> Result<CommitPage, ApiError> {
        self.commit_requests.fetch_add(1, Ordering::SeqCst);
        let dates = self.history.get(path).cloned().unwrap_or_default();
        let pages = dates.len().div_ceil(per_page as usize) as u32;
        let commits = dates
            .chunks(per_page as usize)
            .nth(page.saturating_sub(1) as usize)
            .unwrap_or_default()
            .iter()
            .map(|date| CommitSummary {
                date: Some(*date),
                author: Some("fixture".into()),
            })
            .collect();
        Ok(CommitPage {
            commits,
            last_page: (pages > 1).then_some(pages),
        })
    }

    async fn get_content_by_path(&self, path: &str) -> Result<PathContent, ApiError> {
        Err(not_found(path))
    }

    async fn download(&self, url: &str) -> Result<String, ApiError> {
        Err(not_found(url))
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        url: what.to_string(),
        body: "Not Found".into(),
    }
}

fn entry(name: &str, id: &str, kind: EntryKind) -> TreeEntry {
    TreeEntry {
        name: name.into(),
        id: id.into(),
        kind,
        byte_size: if kind == EntryKind::File { 1800 } else { 0 },
        url: format!("https://fixture.test/{id}"),
    }
}

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

const INTRO: &str = "---\ndesc: Introduction\ntags: [start]\n---\n# Intro\n\n## Why\n\n## How\n";
const SETUP: &str = "---\ndesc: Setup guide\n---\n# Setup\n\nInstall it.\n";
const WIP: &str = "# Work in progress\n";

/// `docs/` holds one markdown file at its root and two more below it.
fn fixture() -> FixtureHost {
    // 150 daily commits, newest first, spanning two pages
    let intro_history: Vec<_> = (0..150)
        .map(|i| day(2021, 1, 1) - Duration::days(i))
        .collect();

    FixtureHost::default()
        .tree(
            "main",
            vec![
                entry("README.md", "b-readme", EntryKind::File),
                entry("docs", "t-docs", EntryKind::Directory),
            ],
        )
        .tree(
            "t-docs",
            vec![
                entry("intro.md", "b-intro", EntryKind::File),
                entry("notes.txt", "b-notes", EntryKind::File),
                entry("guides", "t-guides", EntryKind::Directory),
                entry("drafts", "t-drafts", EntryKind::Directory),
                entry("vendored", "c-sub", EntryKind::Other),
            ],
        )
        .tree("t-guides", vec![entry("setup.md", "b-setup", EntryKind::File)])
        .tree(
            "t-drafts",
            vec![
                entry("wip.md", "b-wip", EntryKind::File),
                entry("assets", "t-assets", EntryKind::Directory),
            ],
        )
        .tree("t-assets", vec![entry("logo.png", "b-logo", EntryKind::File)])
        .blob("b-intro", INTRO)
        .blob("b-setup", SETUP)
        .blob("b-wip", WIP)
        .history("docs/intro.md", intro_history)
        .history("docs/guides/setup.md", vec![day(2023, 6, 1), day(2022, 3, 4)])
}

fn cms(host: FixtureHost) -> GitCms<FixtureHost> {
    GitCms::new(host, CmsConfig::new("owner", "repo").with_src_path("/docs"))
}

#[tokio::test]
async fn non_recursive_listing_returns_root_files_only() {
    let records = cms(fixture())
        .list_items(ListOptions::default())
        .await
        .expect("listing should succeed");

    assert_eq!(records.len(), 1);
    let intro = &records[0];
    assert_eq!(intro.full_path, "docs/intro.md");
    assert_eq!(intro.title.as_deref(), Some("Intro"));
    assert_eq!(intro.frontmatter["desc"], json!("Introduction"));
    assert_eq!(intro.reading_time, 2);
    assert_eq!(intro.path.dir, "docs");
    assert_eq!(intro.path.name, "intro");
    assert_eq!(intro.path.ext, ".md");
}

#[tokio::test]
async fn recursive_listing_returns_nested_files() {
    let records = cms(fixture())
        .list_items(ListOptions {
            recursive: true,
            include_content: false,
            ..ListOptions::default()
        })
        .await
        .expect("listing should succeed");

    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.content.is_none()));

    let mut paths: Vec<&str> = records.iter().map(|r| r.full_path.as_str()).collect();
    paths.sort();
    assert_eq!(
        paths,
        vec!["docs/drafts/wip.md", "docs/guides/setup.md", "docs/intro.md"]
    );
}

#[tokio::test]
async fn extension_absent_from_tree_yields_empty_list() {
    let records = cms(fixture())
        .list_items(ListOptions {
            recursive: true,
            extensions: vec![".mdx".into()],
            ..ListOptions::default()
        })
        .await
        .expect("an unmatched extension is not an error");
    assert!(records.is_empty());
}

#[tokio::test]
async fn content_is_included_by_default() {
    let records = cms(fixture())
        .list_items(ListOptions::default())
        .await
        .unwrap();
    let body = records[0].content.as_deref().expect("body should be present");
    assert!(!body.is_empty());
    assert!(body.starts_with("# Intro"), "front-matter must be stripped: {body}");
}

#[tokio::test]
async fn dates_come_from_both_ends_of_paginated_history() {
    let host = fixture();
    let commit_requests = Arc::clone(&host.commit_requests);
    let records = cms(host)
        .list_items(ListOptions::default())
        .await
        .unwrap();

    // 150 commits span two pages, so the last page is fetched once more
    assert_eq!(commit_requests.load(Ordering::SeqCst), 2);
    let intro = &records[0];
    assert_eq!(intro.updated, Some(day(2021, 1, 1)));
    assert_eq!(intro.created, Some(day(2021, 1, 1) - Duration::days(149)));
}

#[tokio::test]
async fn single_page_history_takes_one_request() {
    let host = FixtureHost::default()
        .tree("main", vec![entry("setup.md", "b-setup", EntryKind::File)])
        .blob("b-setup", SETUP)
        .history("setup.md", vec![day(2023, 6, 1), day(2022, 3, 4)]);
    let commit_requests = Arc::clone(&host.commit_requests);
    let cms: GitCms<FixtureHost> = GitCms::new(host, CmsConfig::new("o", "r"));

    let records = cms.list_items(ListOptions::default()).await.unwrap();
    assert_eq!(records[0].created, Some(day(2022, 3, 4)));
    assert_eq!(records[0].updated, Some(day(2023, 6, 1)));
    assert_eq!(commit_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn descending_sort_places_undated_files_last() {
    let records = cms(fixture())
        .list_items(ListOptions {
            recursive: true,
            ..ListOptions::default()
        })
        .await
        .unwrap();
    let order: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(order, vec!["setup.md", "intro.md", "wip.md"]);
    assert!(records[2].created.is_none() && records[2].updated.is_none());

    let ascending = cms(fixture())
        .list_items(ListOptions {
            recursive: true,
            ascending: true,
            sort_by: SortField::Updated,
            ..ListOptions::default()
        })
        .await
        .unwrap();
    let order: Vec<&str> = ascending.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(order, vec!["wip.md", "intro.md", "setup.md"]);
}

#[tokio::test]
async fn toc_nests_sub_headings() {
    let records = cms(fixture())
        .list_items(ListOptions::default())
        .await
        .unwrap();
    let toc = &records[0].toc;
    assert_eq!(toc.len(), 1);
    let children: Vec<&str> = toc[0].children.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(children, vec!["Why", "How"]);
    assert_eq!(toc[0].children[1].anchor, "#how");
}

#[tokio::test]
async fn bounded_concurrency_gives_the_same_result() {
    let unbounded = cms(fixture())
        .list_items(ListOptions {
            recursive: true,
            ..ListOptions::default()
        })
        .await
        .unwrap();

    let mut config = CmsConfig::new("owner", "repo").with_src_path("docs");
    config.max_concurrency = Some(1);
    let bounded: GitCms<FixtureHost> = GitCms::new(fixture(), config);
    let bounded = bounded
        .list_items(ListOptions {
            recursive: true,
            ..ListOptions::default()
        })
        .await
        .unwrap();

    let unbounded: Vec<&str> = unbounded.iter().map(|r| r.full_path.as_str()).collect();
    let bounded: Vec<&str> = bounded.iter().map(|r| r.full_path.as_str()).collect();
    assert_eq!(unbounded, bounded);
}

#[tokio::test]
async fn missing_folder_is_path_not_found() {
    let err = cms(fixture())
        .list_items(ListOptions {
            path: Some("docs/missing".into()),
            ..ListOptions::default()
        })
        .await
        .unwrap_err();
    match err {
        CmsError::PathNotFound { segment, .. } => assert_eq!(segment, "missing"),
        other => panic!("expected PathNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn a_failing_subtree_fails_the_whole_listing() {
    let mut host = fixture();
    host.trees.remove("t-assets");

    let err = cms(host)
        .list_items(ListOptions {
            recursive: true,
            ..ListOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Api(ApiError::Status { status: 404, .. })));
}

#[tokio::test]
async fn a_failing_blob_fails_the_whole_listing() {
    let mut host = fixture();
    host.blobs.remove("b-wip");

    let err = cms(host)
        .list_items(ListOptions {
            recursive: true,
            ..ListOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Api(_)));
}

#[tokio::test]
async fn schema_violation_aborts_listing() {
    let schema = json!({
        "type": "object",
        "properties": { "desc": { "type": "string" } },
        "required": ["desc"]
    });
    // wip.md has no front-matter, so `desc` is missing
    let err = cms(fixture())
        .with_schema(&schema)
        .unwrap()
        .list_items(ListOptions {
            recursive: true,
            ..ListOptions::default()
        })
        .await
        .unwrap_err();
    match err {
        CmsError::FrontmatterValidation { path, violations } => {
            assert_eq!(path, "docs/drafts/wip.md");
            assert_eq!(violations.len(), 1);
        }
        other => panic!("expected FrontmatterValidation, got {other:?}"),
    }
}

#[derive(Debug, Deserialize)]
struct PostMeta {
    desc: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[tokio::test]
async fn frontmatter_deserializes_into_caller_type() {
    let cms: GitCms<FixtureHost, PostMeta> =
        GitCms::new(fixture(), CmsConfig::new("o", "r").with_src_path("docs"));
    let records = cms.list_items(ListOptions::default()).await.unwrap();
    assert_eq!(records[0].frontmatter.desc, "Introduction");
    assert_eq!(records[0].frontmatter.tags, vec!["start".to_string()]);
}

#[tokio::test]
async fn frontmatter_not_matching_caller_type_is_an_error() {
    let cms: GitCms<FixtureHost, PostMeta> =
        GitCms::new(fixture(), CmsConfig::new("o", "r").with_src_path("docs"));
    let err = cms
        .list_items(ListOptions {
            recursive: true,
            ..ListOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::FrontmatterType { ref path, .. } if path == "docs/drafts/wip.md"));
}

#[tokio::test]
async fn item_by_id_skips_traversal_and_dates() {
    let host = fixture();
    let cms = cms(host);
    let record = cms.get_item_by_id("b-setup").await.unwrap();

    assert_eq!(record.id, "b-setup");
    assert_eq!(record.title.as_deref(), Some("Setup"));
    assert_eq!(record.frontmatter["desc"], json!("Setup guide"));
    assert!(record.created.is_none() && record.updated.is_none());
    assert_eq!(record.full_path, "");
}

#[tokio::test]
async fn raw_content_is_decoded_text_only() {
    let raw = cms(fixture()).get_raw_content("b-intro").await.unwrap();
    assert_eq!(raw, INTRO);
}
