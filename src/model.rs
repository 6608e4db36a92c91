//! Core data model: filters in, normalized job records out.
//!
//! `FilterSet` and `ListingRef` are small value objects passed by clone
//! between pipeline stages. `JobRecord` is the normalized output unit; only
//! `platform`, `id`, and `url` are guaranteed non-empty; every other field
//! degrades to the [`NOT_MENTIONED`] sentinel when the source page does not
//! carry it, so downstream consumers never deal with nulls.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel for fields the source page did not mention.
pub const NOT_MENTIONED: &str = "Not mentioned";

/// One external job-listing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Board {
    Indeed,
    LinkedIn,
}

impl Board {
    /// Platform label used in output records.
    pub fn label(&self) -> &'static str {
        match self {
            Board::Indeed => "Indeed",
            Board::LinkedIn => "LinkedIn",
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Board-agnostic search criteria.
///
/// Only `keyword` is required; every other filter is omitted from the
/// board-specific query when absent. Translated to board vocabulary at the
/// paginator boundary, never inspected above it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSet {
    /// Search keyword / job title (required).
    pub keyword: String,
    /// Geographic location.
    pub location: Option<String>,
    /// Remote filter, free-form ("true"/"false" on most boards).
    pub remote: Option<String>,
    /// Experience level in generic vocabulary (e.g. "entry_level").
    pub experience_level: Option<String>,
    /// Employment type in generic vocabulary (e.g. "fulltime").
    pub job_type: Option<String>,
    /// Posting-age window: days for boards that take a day count.
    pub days_posted: Option<u32>,
    /// Posting-age window token for boards with their own vocabulary.
    pub time_posted: Option<String>,
    /// Search radius in miles, where supported.
    pub radius: Option<u32>,
    /// Sort order ("date", "relevance").
    pub sort_by: Option<String>,
    /// Number of listing pages to walk. The paginator iterates exactly this
    /// many pages; it never auto-discovers a last page.
    pub pages: usize,
}

impl FilterSet {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            location: None,
            remote: None,
            experience_level: None,
            job_type: None,
            days_posted: None,
            time_posted: None,
            radius: None,
            sort_by: None,
            pages: 1,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn with_experience_level(mut self, level: impl Into<String>) -> Self {
        self.experience_level = Some(level.into());
        self
    }

    pub fn with_job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self
    }

    pub fn with_days_posted(mut self, days: u32) -> Self {
        self.days_posted = Some(days);
        self
    }

    pub fn with_time_posted(mut self, token: impl Into<String>) -> Self {
        self.time_posted = Some(token.into());
        self
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_sort_by(mut self, sort: impl Into<String>) -> Self {
        self.sort_by = Some(sort.into());
        self
    }

    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }
}

/// One listing discovered on a search-results page.
///
/// Produced by the paginator, consumed by the detail resolver. Lives only
/// for the duration of one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRef {
    pub board: Board,
    /// Opaque board-specific identifier.
    pub id: String,
    /// Canonical URL of the full record.
    pub url: String,
    /// Title as shown on the listing card, when the card carries one.
    pub title: Option<String>,
}

/// Normalized output unit for one resolved listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub platform: String,
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub posted: String,
    pub url: String,
    pub job_type: String,
    pub is_remote: bool,
    pub experience_level: String,
    pub description: String,
    pub apply_link: String,
    /// Board-specific attributes that only one board produces
    /// (shift, benefits, applicants count, ...).
    pub extra: BTreeMap<String, String>,
}

impl JobRecord {
    /// Skeleton record satisfying the non-empty invariant on
    /// `platform`/`id`/`url`; every best-effort field starts at the sentinel.
    pub fn skeleton(r: &ListingRef) -> Self {
        Self {
            platform: r.board.label().to_string(),
            id: r.id.clone(),
            title: r.title.clone().unwrap_or_else(|| NOT_MENTIONED.to_string()),
            company: NOT_MENTIONED.to_string(),
            location: NOT_MENTIONED.to_string(),
            salary: NOT_MENTIONED.to_string(),
            posted: NOT_MENTIONED.to_string(),
            url: r.url.clone(),
            job_type: NOT_MENTIONED.to_string(),
            is_remote: false,
            experience_level: NOT_MENTIONED.to_string(),
            description: NOT_MENTIONED.to_string(),
            apply_link: NOT_MENTIONED.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Result bundle of one orchestration run.
///
/// `records` holds successfully resolved records in discovery order.
/// `discovered - resolved = dropped`; dropped covers both identifiers that
/// exhausted their retries and identifiers left unattempted by cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub records: Vec<JobRecord>,
    pub discovered: usize,
    pub resolved: usize,
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_satisfies_record_invariant() {
        let r = ListingRef {
            board: Board::LinkedIn,
            id: "1001".to_string(),
            url: "https://www.linkedin.com/jobs/view/1001".to_string(),
            title: None,
        };
        let rec = JobRecord::skeleton(&r);
        assert_eq!(rec.platform, "LinkedIn");
        assert!(!rec.id.is_empty());
        assert!(!rec.url.is_empty());
        assert_eq!(rec.title, NOT_MENTIONED);
        assert_eq!(rec.salary, NOT_MENTIONED);
    }

    #[test]
    fn filter_builder_leaves_absent_keys_absent() {
        let f = FilterSet::new("Data Scientist").with_pages(2);
        assert_eq!(f.keyword, "Data Scientist");
        assert_eq!(f.pages, 2);
        assert!(f.location.is_none());
        assert!(f.job_type.is_none());
    }

    #[test]
    fn record_serializes_with_extra_map() {
        let r = ListingRef {
            board: Board::Indeed,
            id: "abc".to_string(),
            url: "https://in.indeed.com/viewjob?jk=abc".to_string(),
            title: Some("Engineer".to_string()),
        };
        let mut rec = JobRecord::skeleton(&r);
        rec.extra.insert("shift".to_string(), "Day shift".to_string());
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"platform\":\"Indeed\""));
        assert!(json.contains("Day shift"));
    }
}
