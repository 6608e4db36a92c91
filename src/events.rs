//! Typed event stream from every pipeline stage.
//!
//! The bus is a `tokio::sync::broadcast` channel carrying [`ScrapeEvent`]
//! values. The request layer, log sinks, and tests subscribe independently;
//! with no subscribers, emitting is a no-op. Per-identifier drops are
//! reported here at warning level rather than failing the run, since partial
//! results are the expected outcome of a scraping run.

use crate::model::Board;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Everything a run reports while it executes. Serialized to JSON for
/// external consumers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScrapeEvent {
    /// A run started for a board/keyword pair.
    RunStarted { board: Board, keyword: String },
    /// A listing page yielded identifiers.
    PageFetched {
        board: Board,
        page: usize,
        listings: usize,
    },
    /// A listing page loaded intact but contained no listings. Valid
    /// terminal pagination signal, not a failure.
    PageEmpty { board: Board, page: usize },
    /// One identifier resolved to a full record.
    DetailResolved {
        board: Board,
        id: String,
        attempt: u32,
    },
    /// A detail fetch failed and will be retried.
    DetailRetry {
        board: Board,
        id: String,
        attempt: u32,
        error: String,
    },
    /// An identifier exhausted its retry budget and was dropped.
    DetailDropped {
        board: Board,
        id: String,
        attempts: u32,
    },
    /// The run was cancelled; the bundle holds what resolved so far.
    RunCancelled { board: Board, resolved: usize },
    /// The run finished and returned a bundle.
    RunComplete {
        board: Board,
        discovered: usize,
        resolved: usize,
        dropped: usize,
        elapsed_ms: u64,
    },
    /// The run failed fatally at the listing stage.
    RunFailed {
        board: Board,
        page: usize,
        error: String,
    },
}

/// Broadcast bus the orchestrator emits through.
pub struct EventBus {
    sender: broadcast::Sender<ScrapeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit to all subscribers. Silently ignores if nobody is listening.
    pub fn emit(&self, event: ScrapeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScrapeEvent> {
        self.sender.subscribe()
    }
}
