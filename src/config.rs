//! Run configuration: pacing windows, retry policy, concurrency caps.

use crate::model::Board;
use std::time::Duration;

/// Inclusive `[min, max]` window a pacing delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaceRange {
    pub min: Duration,
    pub max: Duration,
}

impl PaceRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    /// Zero-width window. Used by tests to run the pipeline without sleeping.
    pub fn zero() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

/// Per-identifier retry budget for detail resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be at least 1.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Read-only configuration shared by every component of one run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Pacing window before each listing-page fetch.
    pub listing_pace: PaceRange,
    /// Pacing window after each listing page (the between-pages gap).
    pub page_gap: PaceRange,
    /// Pacing window around each detail fetch.
    pub detail_pace: PaceRange,
    /// Dwell window before the in-page interaction sequence on
    /// browser-rendered fetches.
    pub interaction_pace: PaceRange,
    /// Detail retry budget.
    pub retry: RetryPolicy,
    /// Max concurrent in-flight detail fetches against one board.
    pub detail_concurrency: usize,
    /// Per-fetch timeout.
    pub timeout: Duration,
    /// Multiplier applied to the inter-attempt delay after a `Blocked`
    /// failure, compounding per consecutive blocked attempt.
    pub blocked_backoff: f64,
    /// Fixed RNG seed for pacing and identity rotation. Production leaves
    /// this `None`; tests set it for deterministic runs.
    pub rng_seed: Option<u64>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            listing_pace: PaceRange::secs(3, 6),
            page_gap: PaceRange::secs(3, 6),
            detail_pace: PaceRange::secs(3, 6),
            interaction_pace: PaceRange::secs(2, 4),
            retry: RetryPolicy::default(),
            detail_concurrency: 2,
            timeout: Duration::from_secs(10),
            blocked_backoff: 2.0,
            rng_seed: None,
        }
    }
}

impl ScrapeConfig {
    /// Defaults tuned per board. The browser-rendered board gets the longer
    /// listing windows its defenses demand and a single detail worker (one
    /// browser session per in-flight fetch); the plain-HTTP board can run a
    /// few detail workers in parallel.
    pub fn for_board(board: Board) -> Self {
        match board {
            Board::Indeed => Self {
                listing_pace: PaceRange::secs(5, 10),
                page_gap: PaceRange::secs(8, 15),
                detail_pace: PaceRange::secs(3, 6),
                detail_concurrency: 1,
                timeout: Duration::from_secs(30),
                ..Self::default()
            },
            Board::LinkedIn => Self::default(),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32) -> Self {
        self.retry = RetryPolicy { max_attempts };
        self
    }

    pub fn with_detail_concurrency(mut self, cap: usize) -> Self {
        self.detail_concurrency = cap;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// All pacing windows collapsed to zero. Test helper.
    pub fn without_pacing(mut self) -> Self {
        self.listing_pace = PaceRange::zero();
        self.page_gap = PaceRange::zero();
        self.detail_pace = PaceRange::zero();
        self.interaction_pace = PaceRange::zero();
        self
    }
}
