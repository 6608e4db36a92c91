//! Per-run orchestration: Paginating → Resolving → Aggregating → Done.
//!
//! Pagination is strictly sequential; parallel listing fetches trip site
//! defenses. Detail resolution runs on a small bounded worker pool; results
//! land back in discovery order regardless of completion order. A listing
//! failure is fatal to the run; detail failures only shrink the bundle.
//! Cancellation at any point yields the partial bundle aggregated so far.

use crate::boards::BoardProfile;
use crate::config::{PaceRange, ScrapeConfig};
use crate::error::{FetchError, RunError};
use crate::events::{EventBus, ScrapeEvent};
use crate::fetch::Fetcher;
use crate::model::{Bundle, FilterSet, JobRecord, ListingRef};
use crate::pace::Pacer;
use crate::paginate;
use crate::resolve::DetailResolver;
use futures::StreamExt;
use std::collections::HashSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Entry point of the pipeline. One instance can serve many runs; runs
/// share nothing but the read-only configuration and the event bus.
pub struct Orchestrator {
    config: ScrapeConfig,
    events: EventBus,
}

impl Orchestrator {
    pub fn new(config: ScrapeConfig) -> Self {
        Self {
            config,
            events: EventBus::new(256),
        }
    }

    /// Event stream of all runs driven by this orchestrator.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn pacer(&self, range: PaceRange, salt: u64) -> Pacer {
        match self.config.rng_seed {
            Some(seed) => Pacer::with_seed(range, seed ^ salt),
            None => Pacer::new(range),
        }
    }

    /// Execute one run against one board.
    ///
    /// Returns the bundle (possibly partial under cancellation or detail
    /// drops) or a fatal error when a listing page cannot be fetched or the
    /// filter set is unusable. Callers can therefore distinguish "zero
    /// listings found" (`Ok` with empty records) from "run failed" (`Err`)
    /// from "partially succeeded" (`Ok` with `dropped > 0`).
    pub async fn run(
        &self,
        profile: &dyn BoardProfile,
        fetcher: &dyn Fetcher,
        filters: &FilterSet,
        cancel: CancellationToken,
    ) -> Result<Bundle, RunError> {
        if filters.keyword.trim().is_empty() {
            return Err(RunError::InvalidFilter);
        }

        let board = profile.board();
        let started = Instant::now();
        info!(%board, keyword = %filters.keyword, pages = filters.pages, "starting scrape run");
        self.events.emit(ScrapeEvent::RunStarted {
            board,
            keyword: filters.keyword.clone(),
        });

        let listing_pacer = self.pacer(self.config.listing_pace, 0x11);
        let gap_pacer = self.pacer(self.config.page_gap, 0x22);
        let detail_pacer = self.pacer(self.config.detail_pace, 0x33);

        // ── Paginating ──────────────────────────────────────────────────
        let mut refs: Vec<ListingRef> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cancelled = false;

        for page in 0..filters.pages {
            match paginate::list_page(
                profile,
                fetcher,
                &listing_pacer,
                &gap_pacer,
                filters,
                page,
                &cancel,
            )
            .await
            {
                Ok(page_refs) if page_refs.is_empty() => {
                    // Valid terminal signal; later pages are still walked.
                    self.events.emit(ScrapeEvent::PageEmpty { board, page });
                }
                Ok(page_refs) => {
                    let listings = page_refs.len();
                    for r in page_refs {
                        // An id repeated across pages keeps its first
                        // discovery position.
                        if seen.insert(r.id.clone()) {
                            refs.push(r);
                        }
                    }
                    self.events.emit(ScrapeEvent::PageFetched {
                        board,
                        page,
                        listings,
                    });
                }
                Err(FetchError::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(source) => {
                    warn!(%board, page, error = %source, "listing fetch failed, aborting run");
                    self.events.emit(ScrapeEvent::RunFailed {
                        board,
                        page,
                        error: source.to_string(),
                    });
                    return Err(RunError::Listing {
                        board,
                        page,
                        source,
                    });
                }
            }
        }

        // ── Resolving ───────────────────────────────────────────────────
        let discovered = refs.len();
        let mut slots: Vec<Option<JobRecord>> = vec![None; discovered];

        if !cancelled && discovered > 0 {
            let resolver = DetailResolver {
                profile,
                fetcher,
                pacer: &detail_pacer,
                retry: self.config.retry,
                blocked_backoff: self.config.blocked_backoff,
                events: &self.events,
            };
            let concurrency = self.config.detail_concurrency.max(1);
            let resolver_ref = &resolver;
            let cancel_ref = &cancel;

            let mut pending = futures::stream::iter(refs.iter().enumerate())
                .map(|(index, r)| async move { (index, resolver_ref.resolve(r, cancel_ref).await) })
                .buffer_unordered(concurrency);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    next = pending.next() => match next {
                        Some((index, Ok(record))) => slots[index] = Some(record),
                        // Drops and retries were already reported by the resolver.
                        Some((_, Err(_))) => {}
                        None => break,
                    },
                }
            }
        }

        // ── Aggregating ─────────────────────────────────────────────────
        let records: Vec<JobRecord> = slots.into_iter().flatten().collect();
        let resolved = records.len();
        let dropped = discovered - resolved;
        let bundle = Bundle {
            records,
            discovered,
            resolved,
            dropped,
        };

        if cancelled {
            warn!(%board, resolved, discovered, "run cancelled, returning partial bundle");
            self.events.emit(ScrapeEvent::RunCancelled { board, resolved });
        } else {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            info!(%board, discovered, resolved, dropped, elapsed_ms, "run complete");
            self.events.emit(ScrapeEvent::RunComplete {
                board,
                discovered,
                resolved,
                dropped,
                elapsed_ms,
            });
        }
        Ok(bundle)
    }
}
