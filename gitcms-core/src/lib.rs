#![doc = "gitcms-core: list markdown content straight from a GitHub repository."]

//! This crate resolves a folder of a hosted repository to a tree, walks it,
//! and turns every matching file into a [`ContentRecord`] carrying creation and
//! update dates from commit history, a table of contents, a reading-time
//! estimate and schema-validated front-matter.
//!
//! # Usage
//! Build a [`GitCms`] from a [`CmsConfig`] (GitHub) or from any [`HostApi`]
//! implementation, then call [`GitCms::list_items`].

pub mod cms;
pub mod config;
pub mod contract;
pub mod encoding;
pub mod error;
pub mod frontmatter;
pub mod github;
pub mod path;
pub mod record;
pub mod revision;
pub mod toc;
pub mod tree;

pub use cms::{GitCms, ListOptions};
pub use config::CmsConfig;
pub use contract::HostApi;
pub use error::{ApiError, CmsError, FieldViolation};
pub use record::{ContentRecord, SortField};
pub use toc::TocEntry;
