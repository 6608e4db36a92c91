//! Plain-HTTP fetcher wrapping reqwest.
//!
//! Not a browser: one GET per call, with a rotated user-agent header and a
//! hard timeout. Retrying is *not* done here; the retry policy belongs to
//! the detail resolver, which also knows how to back off on `Blocked`.

use super::{classify_response, Document, FetchMode, Fetcher};
use crate::error::FetchError;
use crate::identity::IdentityProvider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fetcher for server-rendered boards.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    identity: Arc<dyn IdentityProvider>,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a client with redirect following and no ambient user-agent;
    /// the identity provider supplies one per request.
    pub fn new(identity: Arc<dyn IdentityProvider>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            identity,
            timeout,
        }
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Document, FetchError> {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.identity.user_agent())
            .timeout(self.timeout)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            r = request => r.map_err(|e| self.map_reqwest_error(e))?,
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            b = response.text() => b.map_err(|e| self.map_reqwest_error(e))?,
        };

        if let Some(err) = classify_response(status, &body) {
            return Err(err);
        }

        Ok(Document {
            url: final_url,
            status,
            body,
        })
    }

    fn mode(&self) -> FetchMode {
        FetchMode::PlainHttp
    }
}
