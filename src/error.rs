//! Failure taxonomy for the scraping pipeline.
//!
//! A field the page does not carry is *not* an error (the extractor returns
//! `None` and the record keeps its sentinel), and an empty listing page is
//! *not* an error (the paginator returns an empty list). Everything that can
//! actually fail a fetch or a run is one of the variants here.

use crate::model::Board;
use std::time::Duration;
use thiserror::Error;

/// Failure of one fetch. Never panics past the fetcher boundary; every
/// transport problem maps onto exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    Http(u16),

    #[error("network error: {0}")]
    Network(String),

    /// Rate-limiting or anti-bot response. Callers back off harder on this
    /// than on an ordinary failed status.
    #[error("blocked by target site (rate limit or challenge)")]
    Blocked,

    #[error("fetch aborted by run cancellation")]
    Cancelled,
}

/// Fatal failure of a whole orchestration run.
///
/// Per-identifier detail failures never surface here; they are retried,
/// then counted as dropped in the bundle. A run fails outright only when a
/// listing page cannot be fetched (no identifiers to resolve), the filter
/// set is unusable, or a browser session cannot be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("filter set is missing the required keyword")]
    InvalidFilter,

    #[error("listing fetch failed on {board} page {page}: {source}")]
    Listing {
        board: Board,
        page: usize,
        source: FetchError,
    },

    #[error("browser session unavailable: {0}")]
    Session(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_error_carries_board_and_page_context() {
        let e = RunError::Listing {
            board: Board::LinkedIn,
            page: 3,
            source: FetchError::Blocked,
        };
        let msg = e.to_string();
        assert!(msg.contains("LinkedIn"));
        assert!(msg.contains("page 3"));
        assert!(msg.contains("blocked"));
    }

    #[test]
    fn fetch_errors_are_comparable() {
        assert_eq!(FetchError::Http(503), FetchError::Http(503));
        assert_ne!(FetchError::Blocked, FetchError::Http(429));
    }
}
