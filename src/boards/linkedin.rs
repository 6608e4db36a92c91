//! LinkedIn profile.
//!
//! Uses the guest jobs API: plain HTTP, no login. Search responses are
//! HTML fragments of listing cards carrying an entity URN; detail pages are
//! server-rendered with stable topcard classes plus a labeled criteria list
//! that feeds the experience-level and job-type fields.

use super::BoardProfile;
use crate::extract::{self, FieldSpec, Locator};
use crate::fetch::FetchMode;
use crate::model::{Board, FilterSet, JobRecord, ListingRef};
use scraper::Html;
use url::Url;

const SEARCH_URL: &str = "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search";
const RESULTS_PER_PAGE: usize = 25;

pub struct LinkedIn;

impl BoardProfile for LinkedIn {
    fn board(&self) -> Board {
        Board::LinkedIn
    }

    fn mode(&self) -> FetchMode {
        FetchMode::PlainHttp
    }

    fn search_url(&self, filters: &FilterSet, page: usize) -> String {
        let mut url = Url::parse(SEARCH_URL).unwrap();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("keywords", &filters.keyword);
            if let Some(v) = &filters.location {
                q.append_pair("location", v);
            }
            if let Some(v) = &filters.remote {
                q.append_pair("remote", v);
            }
            if let Some(v) = &filters.experience_level {
                q.append_pair("experience_level", v);
            }
            if let Some(v) = &filters.job_type {
                q.append_pair("job_type", v);
            }
            if let Some(v) = &filters.time_posted {
                q.append_pair("time_posted", v);
            }
            q.append_pair("start", &(page * RESULTS_PER_PAGE).to_string());
        }
        url.to_string()
    }

    fn detail_url(&self, id: &str) -> String {
        format!("https://www.linkedin.com/jobs-guest/jobs/api/jobPosting/{id}")
    }

    fn listing_refs(&self, doc: &Html) -> Vec<ListingRef> {
        extract::extract_each(doc, "div.base-card", Some("data-entity-urn"))
            .into_iter()
            .filter_map(|urn| {
                // "urn:li:jobPosting:3544610012"; the identifier is the
                // last colon-separated segment.
                let id = urn.rsplit(':').next()?.to_string();
                if id.is_empty() {
                    return None;
                }
                Some(ListingRef {
                    board: Board::LinkedIn,
                    url: format!("https://www.linkedin.com/jobs/view/{id}"),
                    id,
                    title: None,
                })
            })
            .collect()
    }

    fn page_intact(&self, doc: &Html) -> bool {
        // The guest API returns a bare fragment of cards; an empty fragment
        // is a valid empty page. Only an auth wall or challenge page means
        // the structure is gone.
        !extract::present(doc, "form.challenge")
            && !extract::present(doc, "div.authwall")
            && extract::extract_one(doc, &Locator::text_contains("unusual traffic")).is_none()
    }

    // Detail pages come from the same guest surface and fail the same way:
    // a challenge or auth wall in place of the document.
    fn detail_intact(&self, doc: &Html) -> bool {
        self.page_intact(doc)
    }

    fn build_record(&self, r: &ListingRef, doc: &Html) -> JobRecord {
        let mut rec = JobRecord::skeleton(r);

        set_field(&mut rec.title, extract::extract(doc, &title_spec()));
        set_field(
            &mut rec.company,
            extract::extract_one(doc, &Locator::css("a.topcard__org-name-link")),
        );
        set_field(
            &mut rec.location,
            extract::extract_one(doc, &Locator::css("span.topcard__flavor--bullet")),
        );
        set_field(
            &mut rec.posted,
            extract::extract_one(doc, &Locator::css("span.posted-time-ago__text")),
        );
        set_field(&mut rec.description, description(doc));

        if let Some(v) = extract::extract_one(doc, &Locator::css("span.num-applicants__caption")) {
            rec.extra.insert("applicants".to_string(), v);
        }
        if let Some(v) =
            extract::extract_one(doc, &Locator::attr("a.topcard__org-name-link", "href"))
        {
            rec.extra.insert("company_url".to_string(), v);
        }

        for (key, value) in extract::extract_pairs(
            doc,
            "li.description__job-criteria-item",
            "h3",
            "span",
        ) {
            let key = key.to_lowercase().replace(' ', "_");
            match key.as_str() {
                "seniority_level" => rec.experience_level = value,
                "employment_type" => rec.job_type = value,
                _ => {
                    rec.extra.insert(key, value);
                }
            }
        }

        rec.is_remote = rec.location.contains("Remote");
        rec
    }
}

fn title_spec() -> FieldSpec {
    FieldSpec::new(
        "title",
        vec![
            Locator::css("h2.top-card-layout__title"),
            Locator::css("h1.top-card-layout__title"),
        ],
    )
}

/// Description paragraphs joined with newlines; falls back to the whole
/// markup block when it has no paragraph tags.
fn description(doc: &Html) -> Option<String> {
    let paragraphs = extract::extract_each(doc, "div.show-more-less-html__markup p", None);
    if !paragraphs.is_empty() {
        return Some(paragraphs.join("\n"));
    }
    extract::extract_one(doc, &Locator::css("div.show-more-less-html__markup"))
}

fn set_field(field: &mut String, value: Option<String>) {
    if let Some(v) = value {
        *field = v;
    }
}
