//! Listing pagination: one generic filter set, one board, one page index.
//!
//! The paginator walks exactly the pages the caller asked for; it never
//! auto-discovers a last page. An empty-but-intact results page comes back
//! as `Ok(vec![])`, a valid terminal signal; a page whose expected skeleton
//! is entirely absent is reported as `Blocked` so the caller backs off.

use crate::boards::BoardProfile;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::model::{FilterSet, ListingRef};
use crate::pace::Pacer;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Fetch one listing page and extract its listing references.
///
/// Paces before the fetch (listing window) and after it (between-pages
/// gap). Listing-level fetch failures are returned verbatim: without a
/// listing page there is nothing to resolve, so the orchestrator treats
/// them as fatal.
pub async fn list_page(
    profile: &dyn BoardProfile,
    fetcher: &dyn Fetcher,
    pace_before: &Pacer,
    pace_after: &Pacer,
    filters: &FilterSet,
    page: usize,
    cancel: &CancellationToken,
) -> Result<Vec<ListingRef>, FetchError> {
    pace_before.pause(cancel).await?;

    let url = profile.search_url(filters, page);
    debug!(board = %profile.board(), page, %url, "fetching listing page");
    let doc = fetcher.fetch(&url, cancel).await?;

    // Parse inside a sync scope: scraper's types are !Send and must not
    // live across the pacing await below.
    let (refs, intact) = {
        let parsed = Html::parse_document(&doc.body);
        (profile.listing_refs(&parsed), profile.page_intact(&parsed))
    };

    if refs.is_empty() && !intact {
        info!(board = %profile.board(), page, "listing skeleton absent, treating as blocked");
        return Err(FetchError::Blocked);
    }

    info!(board = %profile.board(), page, listings = refs.len(), "listing page processed");
    pace_after.pause(cancel).await?;
    Ok(refs)
}
