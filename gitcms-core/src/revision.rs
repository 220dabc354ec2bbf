//! Creation and last-update dates derived from commit history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::contract::{HostApi, COMMITS_PER_PAGE};
use crate::error::CmsError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevisionPair {
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Dates of the oldest and newest commits touching exactly `path`.
///
/// At most two requests: the first page gives the newest commit, and when the
/// host reports a later last page, that page's final entry is the oldest.
/// A path with no history yields `None` for both.
pub async fn resolve_dates<H>(api: &H, path: &str) -> Result<RevisionPair, CmsError>
where
    H: HostApi + ?Sized,
{
    let first = api.get_commit_history(path, 1, COMMITS_PER_PAGE).await?;
    let updated = first.commits.first().and_then(|c| c.date);
    let mut created = first.commits.last().and_then(|c| c.date);

    if let Some(last_page) = first.last_page.filter(|page| *page > 1) {
        let last = api
            .get_commit_history(path, last_page, COMMITS_PER_PAGE)
            .await?;
        if let Some(commit) = last.commits.last() {
            created = commit.date;
        }
    }

    debug!(path, ?created, ?updated, "Resolved revision dates");
    Ok(RevisionPair { created, updated })
}
