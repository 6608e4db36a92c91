//! Transport abstraction: one fetch, one document or one typed failure.
//!
//! Two implementations sit behind the [`Fetcher`] trait (plain HTTP via
//! reqwest, browser-rendered via chromiumoxide), so nothing above this
//! seam ever branches on transport mechanics. Tests substitute scripted
//! fakes.

pub mod browser;
pub mod http;

use crate::error::FetchError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use browser::BrowserFetcher;
pub use http::HttpFetcher;

/// How a board's pages must be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Server-rendered pages reachable with a plain GET.
    PlainHttp,
    /// Client-rendered pages behind stronger anti-bot defenses; need a
    /// real browser session.
    BrowserRendered,
}

/// Raw document returned by a successful fetch.
#[derive(Debug, Clone)]
pub struct Document {
    /// URL the body was captured from (after redirects).
    pub url: String,
    /// HTTP status. Browser-rendered fetches report 200: the protocol
    /// layer does not expose the status, so blocked pages are instead
    /// detected structurally by the paginator.
    pub status: u16,
    pub body: String,
}

/// Performs one network fetch with a fresh identity and a timeout.
///
/// Implementations must always return within the timeout plus bounded
/// overhead and must never panic past this boundary: every failure is a
/// [`FetchError`] variant.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Document, FetchError>;

    fn mode(&self) -> FetchMode;
}

/// Phrases that mark an anti-bot challenge page.
const CHALLENGE_MARKERS: &[&str] = &[
    "captcha",
    "unusual traffic",
    "verify you are a human",
    "cf-challenge",
    "just a moment",
];

/// Map a response status (plus body, for challenge sniffing) to a failure,
/// or `None` when the response is usable.
///
/// 429 always means rate limiting. 403/503 count as blocked only when the
/// body carries a challenge marker, since some sites use them for ordinary
/// errors too.
pub fn classify_response(status: u16, body: &str) -> Option<FetchError> {
    if (200..300).contains(&status) {
        return None;
    }
    if status == 429 {
        return Some(FetchError::Blocked);
    }
    if (status == 403 || status == 503) && body_has_challenge(body) {
        return Some(FetchError::Blocked);
    }
    Some(FetchError::Http(status))
}

fn body_has_challenge(body: &str) -> bool {
    let lower = body.to_lowercase();
    CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Run a fetch step under a hard deadline, mapping expiry to
/// [`FetchError::Timeout`]. Covers protocol calls that carry no timeout of
/// their own, so a stalled connection cannot hang a fetch indefinitely.
pub(crate) async fn deadline<T, F>(limit: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_are_usable() {
        assert_eq!(classify_response(200, ""), None);
        assert_eq!(classify_response(204, ""), None);
    }

    #[test]
    fn rate_limit_status_is_blocked() {
        assert_eq!(classify_response(429, ""), Some(FetchError::Blocked));
    }

    #[test]
    fn forbidden_is_blocked_only_with_challenge_body() {
        assert_eq!(classify_response(403, "plain denial"), Some(FetchError::Http(403)));
        assert_eq!(
            classify_response(403, "<title>Just a moment...</title>"),
            Some(FetchError::Blocked)
        );
        assert_eq!(
            classify_response(503, "complete the CAPTCHA to continue"),
            Some(FetchError::Blocked)
        );
    }

    #[test]
    fn other_failures_keep_their_status() {
        assert_eq!(classify_response(404, ""), Some(FetchError::Http(404)));
        assert_eq!(classify_response(500, ""), Some(FetchError::Http(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_out_a_stalled_step() {
        let limit = Duration::from_secs(3);
        let err = deadline::<Document, _>(limit, std::future::pending())
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Timeout(limit));
    }

    #[tokio::test]
    async fn deadline_passes_a_prompt_result_through() {
        let ok = deadline(Duration::from_secs(3), async { Ok(7u16) }).await;
        assert_eq!(ok, Ok(7));
        let err = deadline(Duration::from_secs(3), async {
            Err::<u16, _>(FetchError::Blocked)
        })
        .await;
        assert_eq!(err, Err(FetchError::Blocked));
    }
}
