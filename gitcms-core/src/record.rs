//! Final content records and their ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::PathParts;
use crate::revision::RevisionPair;
use crate::toc::{extract_toc, TocEntry};
use crate::tree::FileDescriptor;

pub const AVERAGE_WORD_LENGTH: u64 = 5;
pub const AVERAGE_WORDS_PER_MINUTE: u64 = 200;

/// Estimated minutes to read a document of `byte_size` bytes.
pub fn reading_time(byte_size: u64) -> u64 {
    byte_size.div_ceil(AVERAGE_WORD_LENGTH * AVERAGE_WORDS_PER_MINUTE)
}

/// A listed document with everything derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord<FM> {
    pub path: PathParts,
    pub full_path: String,
    pub file_name: String,
    pub id: String,
    pub byte_size: u64,
    pub url: String,
    /// Title of the first top-level table of contents entry.
    pub title: Option<String>,
    pub reading_time: u64,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub frontmatter: FM,
    pub toc: Vec<TocEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl<FM> ContentRecord<FM> {
    /// Combine a file's derived values into a record. The table of contents is
    /// built from `body`, which is kept only when `include_content` is set.
    pub fn assemble(
        file: FileDescriptor,
        dates: RevisionPair,
        frontmatter: FM,
        body: String,
        include_content: bool,
    ) -> Self {
        let toc = extract_toc(&body);
        Self {
            path: PathParts::parse(&file.full_path),
            title: toc
                .first()
                .map(|entry| entry.title.clone())
                .filter(|title| !title.is_empty()),
            reading_time: reading_time(file.byte_size),
            full_path: file.full_path,
            file_name: file.file_name,
            id: file.id,
            byte_size: file.byte_size,
            url: file.content_url,
            created: dates.created,
            updated: dates.updated,
            frontmatter,
            toc,
            content: include_content.then_some(body),
        }
    }

    pub fn date(&self, field: SortField) -> Option<DateTime<Utc>> {
        match field {
            SortField::Created => self.created,
            SortField::Updated => self.updated,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Created,
    Updated,
}

/// Order records by `field`. A missing date counts as infinitely old, so it
/// sorts first ascending and last descending. The sort is stable.
pub fn sort_records<FM>(records: &mut [ContentRecord<FM>], field: SortField, ascending: bool) {
    records.sort_by(|a, b| {
        let ordering = a.date(field).cmp(&b.date(field));
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}
