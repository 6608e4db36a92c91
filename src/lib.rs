//! Boardwalk, a resilient job-board scraping engine.
//!
//! Turns a generic [`FilterSet`] into a [`Bundle`] of normalized
//! [`JobRecord`]s for one board, surviving the routine failures of scraping
//! (missing fields, blocked requests, rate limits, stale selectors) with
//! typed outcomes instead of crashes. Listing pages are walked
//! sequentially and paced; detail pages are resolved on a small bounded
//! worker pool with per-identifier retries; results come back in stable
//! discovery order.
//!
//! # Example
//!
//! ```rust,ignore
//! use boardwalk::{scrape, Board, FilterSet, ScrapeConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let filters = FilterSet::new("Data Scientist")
//!         .with_location("New York")
//!         .with_pages(2);
//!     let config = ScrapeConfig::for_board(Board::LinkedIn);
//!     let bundle = scrape(Board::LinkedIn, &filters, config, CancellationToken::new())
//!         .await
//!         .unwrap();
//!     println!(
//!         "discovered {} resolved {} dropped {}",
//!         bundle.discovered, bundle.resolved, bundle.dropped
//!     );
//! }
//! ```

pub mod boards;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod fetch;
pub mod identity;
pub mod model;
pub mod orchestrate;
pub mod pace;
pub mod paginate;
pub mod resolve;

pub use config::{PaceRange, RetryPolicy, ScrapeConfig};
pub use error::{FetchError, RunError};
pub use events::{EventBus, ScrapeEvent};
pub use model::{Board, Bundle, FilterSet, JobRecord, ListingRef, NOT_MENTIONED};
pub use orchestrate::Orchestrator;

use crate::boards::profile_for;
use crate::fetch::{BrowserFetcher, FetchMode, HttpFetcher};
use crate::identity::{IdentityProvider, UserAgentPool};
use crate::pace::Pacer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run one scrape against one board with the transport its pages require.
///
/// Convenience wrapper for callers that do not need to inject their own
/// fetcher or observe the event stream; those construct an
/// [`Orchestrator`] directly.
pub async fn scrape(
    board: Board,
    filters: &FilterSet,
    config: ScrapeConfig,
    cancel: CancellationToken,
) -> Result<Bundle, RunError> {
    let profile = profile_for(board);
    let identity: Arc<dyn IdentityProvider> = match config.rng_seed {
        Some(seed) => Arc::new(UserAgentPool::with_seed(seed)),
        None => Arc::new(UserAgentPool::new()),
    };
    let timeout = config.timeout;
    let interaction = match config.rng_seed {
        Some(seed) => Pacer::with_seed(config.interaction_pace, seed ^ 0x44),
        None => Pacer::new(config.interaction_pace),
    };
    let orchestrator = Orchestrator::new(config);

    match profile.mode() {
        FetchMode::PlainHttp => {
            let fetcher = HttpFetcher::new(identity, timeout);
            orchestrator.run(profile, &fetcher, filters, cancel).await
        }
        FetchMode::BrowserRendered => {
            let fetcher = BrowserFetcher::launch(identity, timeout)
                .await?
                .with_interaction(interaction);
            orchestrator.run(profile, &fetcher, filters, cancel).await
        }
    }
}
