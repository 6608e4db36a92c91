//! Detail resolution: one listing reference to one normalized record.
//!
//! Fetch failures are retried up to the configured attempt budget with a
//! pacing delay between attempts; `Blocked` compounds that delay by the
//! configured backoff factor. Exhausting the budget drops the identifier:
//! a warning event, never a run failure. A fetched body whose detail
//! skeleton is absent counts as a blocked attempt. Field extraction inside
//! an intact document cannot fail at all: misses keep their sentinel.

use crate::boards::BoardProfile;
use crate::config::RetryPolicy;
use crate::error::FetchError;
use crate::events::{EventBus, ScrapeEvent};
use crate::fetch::Fetcher;
use crate::model::{JobRecord, ListingRef};
use crate::pace::Pacer;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why one identifier produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// Every attempt failed; the identifier is dropped from the bundle.
    Exhausted { attempts: u32 },
    /// The run was cancelled before this identifier resolved. Not counted
    /// as a retry exhaustion; it was simply never completed.
    Cancelled,
}

/// Per-run detail resolver, shared by all detail workers.
pub struct DetailResolver<'a> {
    pub profile: &'a dyn BoardProfile,
    pub fetcher: &'a dyn Fetcher,
    pub pacer: &'a Pacer,
    pub retry: RetryPolicy,
    /// Multiplier applied to the pacing delay after a blocked attempt,
    /// compounding while blocks continue.
    pub blocked_backoff: f64,
    pub events: &'a EventBus,
}

impl DetailResolver<'_> {
    /// Resolve one listing reference, retrying per policy.
    pub async fn resolve(
        &self,
        r: &ListingRef,
        cancel: &CancellationToken,
    ) -> Result<JobRecord, ResolveFailure> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut backoff = 1.0f64;

        for attempt in 1..=max_attempts {
            match self.pacer.pause_scaled(backoff, cancel).await {
                Ok(()) => {}
                Err(_) => return Err(ResolveFailure::Cancelled),
            }

            let fetched = self
                .fetcher
                .fetch(&self.profile.detail_url(&r.id), cancel)
                .await
                .and_then(|doc| {
                    // Parse in a sync scope. Challenge and auth-wall bodies
                    // arrive with a success status; an absent skeleton is a
                    // blocked attempt, not an empty record.
                    let parsed = Html::parse_document(&doc.body);
                    if !self.profile.detail_intact(&parsed) {
                        return Err(FetchError::Blocked);
                    }
                    Ok(self.profile.build_record(r, &parsed))
                });
            match fetched {
                Ok(record) => {
                    info!(board = %r.board, id = %r.id, attempt, "resolved detail record");
                    self.events.emit(ScrapeEvent::DetailResolved {
                        board: r.board,
                        id: r.id.clone(),
                        attempt,
                    });
                    return Ok(record);
                }
                Err(FetchError::Cancelled) => return Err(ResolveFailure::Cancelled),
                Err(e) => {
                    if e == FetchError::Blocked {
                        backoff *= self.blocked_backoff.max(1.0);
                    }
                    debug!(board = %r.board, id = %r.id, attempt, error = %e, "detail fetch failed");
                    self.events.emit(ScrapeEvent::DetailRetry {
                        board: r.board,
                        id: r.id.clone(),
                        attempt,
                        error: e.to_string(),
                    });
                }
            }
        }

        warn!(
            board = %r.board,
            id = %r.id,
            attempts = max_attempts,
            "dropping identifier after exhausting retries"
        );
        self.events.emit(ScrapeEvent::DetailDropped {
            board: r.board,
            id: r.id.clone(),
            attempts: max_attempts,
        });
        Err(ResolveFailure::Exhausted {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards::LinkedIn;
    use crate::config::PaceRange;
    use crate::fetch::{Document, FetchMode};
    use crate::model::Board;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` fetches, then succeeds.
    struct FlakyFetcher {
        failures: u32,
        error: FetchError,
        calls: AtomicU32,
    }

    impl FlakyFetcher {
        fn new(failures: u32, error: FetchError) -> Self {
            Self {
                failures,
                error,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(
            &self,
            url: &str,
            _cancel: &CancellationToken,
        ) -> Result<Document, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(Document {
                    url: url.to_string(),
                    status: 200,
                    body: r#"<h2 class="top-card-layout__title">Engineer</h2>"#.to_string(),
                })
            }
        }

        fn mode(&self) -> FetchMode {
            FetchMode::PlainHttp
        }
    }

    /// Serves scripted bodies in call order, repeating the last one.
    struct BodyScript {
        bodies: Vec<&'static str>,
        calls: AtomicU32,
    }

    impl BodyScript {
        fn new(bodies: Vec<&'static str>) -> Self {
            Self {
                bodies,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for BodyScript {
        async fn fetch(
            &self,
            url: &str,
            _cancel: &CancellationToken,
        ) -> Result<Document, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let body = self
                .bodies
                .get(call)
                .or_else(|| self.bodies.last())
                .copied()
                .unwrap_or_default();
            Ok(Document {
                url: url.to_string(),
                status: 200,
                body: body.to_string(),
            })
        }

        fn mode(&self) -> FetchMode {
            FetchMode::PlainHttp
        }
    }

    const AUTHWALL: &str = r#"<div class="authwall">Verify you are a human</div>"#;
    const GOOD_DETAIL: &str = r#"<h2 class="top-card-layout__title">Engineer</h2>"#;

    fn test_ref() -> ListingRef {
        ListingRef {
            board: Board::LinkedIn,
            id: "1001".to_string(),
            url: "https://www.linkedin.com/jobs/view/1001".to_string(),
            title: None,
        }
    }

    fn resolver<'a>(fetcher: &'a dyn Fetcher, pacer: &'a Pacer, events: &'a EventBus) -> DetailResolver<'a> {
        DetailResolver {
            profile: &LinkedIn,
            fetcher,
            pacer,
            retry: RetryPolicy { max_attempts: 3 },
            blocked_backoff: 2.0,
            events,
        }
    }

    #[tokio::test]
    async fn resolves_on_attempt_k_plus_one_when_k_below_budget() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 1);
        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let fetcher = FlakyFetcher::new(2, FetchError::Http(500));
        let r = resolver(&fetcher, &pacer, &events);

        let record = r.resolve(&test_ref(), &CancellationToken::new()).await.unwrap();
        assert_eq!(record.title, "Engineer");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        // Two retry events then one resolved event, nothing dropped.
        let mut retries = 0;
        let mut resolved_attempt = 0;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                ScrapeEvent::DetailRetry { .. } => retries += 1,
                ScrapeEvent::DetailResolved { attempt, .. } => resolved_attempt = attempt,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(retries, 2);
        assert_eq!(resolved_attempt, 3);
    }

    #[tokio::test]
    async fn exhausting_the_budget_drops_the_identifier() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 1);
        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let fetcher = FlakyFetcher::new(3, FetchError::Http(500));
        let r = resolver(&fetcher, &pacer, &events);

        let failure = r
            .resolve(&test_ref(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(failure, ResolveFailure::Exhausted { attempts: 3 });
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        let mut dropped = 0;
        while let Ok(ev) = rx.try_recv() {
            if let ScrapeEvent::DetailDropped { attempts, .. } = ev {
                dropped += 1;
                assert_eq!(attempts, 3);
            }
        }
        assert_eq!(dropped, 1);
    }

    #[tokio::test]
    async fn blocked_failures_are_retried_like_http_failures() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 1);
        let events = EventBus::new(64);
        let fetcher = FlakyFetcher::new(1, FetchError::Blocked);
        let r = resolver(&fetcher, &pacer, &events);

        let record = r.resolve(&test_ref(), &CancellationToken::new()).await.unwrap();
        assert_eq!(record.title, "Engineer");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn challenge_body_reads_as_blocked_and_is_retried() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 1);
        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let fetcher = BodyScript::new(vec![AUTHWALL, GOOD_DETAIL]);
        let r = resolver(&fetcher, &pacer, &events);

        let record = r.resolve(&test_ref(), &CancellationToken::new()).await.unwrap();
        assert_eq!(record.title, "Engineer");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

        // The challenge attempt must report a blocked retry, never a
        // resolved sentinel record.
        let mut retries = Vec::new();
        let mut resolved_attempt = 0;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                ScrapeEvent::DetailRetry { attempt, error, .. } => retries.push((attempt, error)),
                ScrapeEvent::DetailResolved { attempt, .. } => resolved_attempt = attempt,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(retries.len(), 1);
        assert_eq!(retries[0].0, 1);
        assert!(retries[0].1.contains("blocked"), "error = {}", retries[0].1);
        assert_eq!(resolved_attempt, 2);
    }

    #[tokio::test]
    async fn persistent_challenge_page_never_resolves_as_a_record() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 1);
        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let fetcher = BodyScript::new(vec![AUTHWALL]);
        let r = resolver(&fetcher, &pacer, &events);

        let failure = r
            .resolve(&test_ref(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(failure, ResolveFailure::Exhausted { attempts: 3 });
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        let mut dropped = 0;
        while let Ok(ev) = rx.try_recv() {
            if let ScrapeEvent::DetailDropped { .. } = ev {
                dropped += 1;
            }
        }
        assert_eq!(dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_attempts_compound_the_pacing_delay() {
        // Fixed 100ms window; two blocked attempts double it twice:
        // 100ms + 200ms + 400ms of pacing before the third fetch succeeds.
        let pacer = Pacer::with_seed(PaceRange::millis(100, 100), 1);
        let events = EventBus::new(64);
        let fetcher = FlakyFetcher::new(2, FetchError::Blocked);
        let r = resolver(&fetcher, &pacer, &events);

        let started = tokio::time::Instant::now();
        let record = r.resolve(&test_ref(), &CancellationToken::new()).await.unwrap();
        assert_eq!(record.title, "Engineer");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(700), "elapsed = {elapsed:?}");
        assert!(elapsed < Duration::from_millis(750), "elapsed = {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn plain_failures_do_not_compound_the_pacing_delay() {
        let pacer = Pacer::with_seed(PaceRange::millis(100, 100), 1);
        let events = EventBus::new(64);
        let fetcher = FlakyFetcher::new(2, FetchError::Http(500));
        let r = resolver(&fetcher, &pacer, &events);

        let started = tokio::time::Instant::now();
        r.resolve(&test_ref(), &CancellationToken::new()).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "elapsed = {elapsed:?}");
        assert!(elapsed < Duration::from_millis(350), "elapsed = {elapsed:?}");
    }

    #[tokio::test]
    async fn cancellation_is_not_an_exhaustion() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 1);
        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let fetcher = FlakyFetcher::new(u32::MAX, FetchError::Http(500));
        let r = resolver(&fetcher, &pacer, &events);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let failure = r.resolve(&test_ref(), &cancel).await.unwrap_err();
        assert_eq!(failure, ResolveFailure::Cancelled);

        // No drop event: the identifier was never attempted to exhaustion.
        while let Ok(ev) = rx.try_recv() {
            assert!(
                !matches!(ev, ScrapeEvent::DetailDropped { .. }),
                "cancellation must not report a retry exhaustion"
            );
        }
    }
}
