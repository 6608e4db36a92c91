//! Indeed profile.
//!
//! Indeed's result pages are client-rendered behind aggressive bot
//! defenses, so the profile asks for the browser transport. Listing cards
//! carry the job key in `data-jk`; detail pages expose most fields through
//! OpenGraph tags and literal text snippets rather than stable CSS classes.

use super::BoardProfile;
use crate::extract::{self, FieldSpec, Locator};
use crate::fetch::FetchMode;
use crate::model::{Board, FilterSet, JobRecord, ListingRef};
use scraper::Html;
use url::Url;

const SEARCH_URL: &str = "https://in.indeed.com/jobs";
const RESULTS_PER_PAGE: usize = 10;

const JOB_TYPE_OPTIONS: &[&str] = &[
    "Full-time",
    "Part-time",
    "Internship",
    "Permanent",
    "Contract",
];

const SHIFT_OPTIONS: &[&str] = &[
    "Day shift",
    "Night shift",
    "Rotational shift",
    "Fixed shift",
];

pub struct Indeed;

impl BoardProfile for Indeed {
    fn board(&self) -> Board {
        Board::Indeed
    }

    fn mode(&self) -> FetchMode {
        FetchMode::BrowserRendered
    }

    fn search_url(&self, filters: &FilterSet, page: usize) -> String {
        let mut url = Url::parse(SEARCH_URL).unwrap();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("q", &filters.keyword);
            if let Some(v) = &filters.location {
                q.append_pair("l", v);
            }
            if let Some(v) = filters.days_posted {
                q.append_pair("fromage", &v.to_string());
            }
            if let Some(v) = filters.radius {
                q.append_pair("radius", &v.to_string());
            }
            if let Some(v) = &filters.job_type {
                q.append_pair("jt", v);
            }
            if let Some(v) = &filters.sort_by {
                q.append_pair("sort", v);
            }
            if let Some(v) = &filters.experience_level {
                q.append_pair("explvl", v);
            }
            if let Some(v) = &filters.remote {
                q.append_pair("remote", v);
            }
            q.append_pair("start", &(page * RESULTS_PER_PAGE).to_string());
        }
        url.to_string()
    }

    fn detail_url(&self, id: &str) -> String {
        format!("https://in.indeed.com/viewjob?jk={id}")
    }

    fn listing_refs(&self, doc: &Html) -> Vec<ListingRef> {
        extract::extract_each_with_text(doc, "div.job_seen_beacon a.jcs-JobTitle", "data-jk")
            .into_iter()
            .map(|(id, title)| ListingRef {
                board: Board::Indeed,
                url: self.detail_url(&id),
                id,
                title: if title.is_empty() { None } else { Some(title) },
            })
            .collect()
    }

    fn page_intact(&self, doc: &Html) -> bool {
        extract::present(doc, "div#mosaic-provider-jobcards")
            || extract::present(doc, "td#resultsCol")
            || extract::present(doc, "div.jobsearch-NoResult-messageContainer")
    }

    fn detail_intact(&self, doc: &Html) -> bool {
        extract::present(doc, "h1.jobsearch-JobInfoHeader-title")
            || extract::present(doc, "div.jobsearch-JobComponent-description")
            || extract::present(doc, r#"meta[property="og:title"]"#)
            || extract::present(doc, r#"meta[property="og:description"]"#)
    }

    fn build_record(&self, r: &ListingRef, doc: &Html) -> JobRecord {
        let mut rec = JobRecord::skeleton(r);

        set_field(&mut rec.title, extract::extract(doc, &title_spec()));
        set_field(
            &mut rec.company,
            extract::extract_one(doc, &Locator::meta("og:description")),
        );
        // The <title> reads "Role - Location - Company"; the middle segment
        // is the only place the location reliably appears.
        if let Some(t) = extract::extract_one(doc, &Locator::css("title")) {
            if let Some(seg) = t.split(" - ").nth(1) {
                let seg = seg.trim();
                if !seg.is_empty() {
                    rec.location = seg.to_string();
                }
            }
        }
        rec.is_remote = extract::present(doc, "div.remote-badge");
        set_field(
            &mut rec.description,
            extract::extract_one(doc, &Locator::css("div.jobsearch-JobComponent-description")),
        );
        set_field(
            &mut rec.salary,
            extract::extract_one(doc, &Locator::text_contains("₹")),
        );
        set_field(&mut rec.job_type, joined_options(doc, JOB_TYPE_OPTIONS));
        set_field(
            &mut rec.apply_link,
            extract::extract_one(doc, &Locator::meta("og:url")),
        );

        if let Some(v) = joined_options(doc, SHIFT_OPTIONS) {
            rec.extra.insert("shift".to_string(), v);
        }
        if let Some(v) = extract::extract_one(doc, &Locator::after_heading("Benefits")) {
            rec.extra.insert("benefits".to_string(), v);
        }
        if let Some(v) = extract::extract_one(doc, &Locator::meta("og:image")) {
            rec.extra.insert("image_link".to_string(), v);
        }

        rec
    }
}

fn title_spec() -> FieldSpec {
    FieldSpec::new(
        "title",
        vec![
            Locator::css("h1.jobsearch-JobInfoHeader-title"),
            Locator::meta("og:title"),
        ],
    )
}

/// Which of the literal option strings appear as whole text nodes, joined
/// in option order. Indeed marks these as bare text, not markup; whole-node
/// matching keeps a label mentioned inside prose from counting.
fn joined_options(doc: &Html, options: &[&str]) -> Option<String> {
    let found: Vec<&str> = options
        .iter()
        .filter(|opt| extract::has_exact_text(doc, opt))
        .copied()
        .collect();
    if found.is_empty() {
        None
    } else {
        Some(found.join(", "))
    }
}

fn set_field(field: &mut String, value: Option<String>) {
    if let Some(v) = value {
        *field = v;
    }
}
