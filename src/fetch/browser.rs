//! Browser-rendered fetcher over chromiumoxide.
//!
//! One headless Chromium process per fetcher; one fresh page (exclusive
//! session) per fetch, so concurrent detail workers never share a tab. The
//! launch flags and the `navigator.webdriver` override keep the obvious
//! automation signals down; the optional dwell-and-gesture sequence between
//! navigation and capture is driven by the pacer.

use super::{Document, FetchMode, Fetcher};
use crate::error::{FetchError, RunError};
use crate::identity::IdentityProvider;
use crate::pace::{InteractionSurface, Pacer};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WEBDRIVER_SPOOF: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

/// Allowance past the navigation timeout for the post-navigation protocol
/// calls and the dwell-and-gesture sequence.
const DRIVE_OVERHEAD: Duration = Duration::from_secs(30);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. BOARDWALK_CHROMIUM env
    if let Ok(p) = std::env::var("BOARDWALK_CHROMIUM") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Fetcher for boards whose pages only exist after client-side rendering.
pub struct BrowserFetcher {
    browser: Browser,
    identity: Arc<dyn IdentityProvider>,
    timeout: Duration,
    /// When set, each fetch dwells and gestures on the page before capture.
    interaction: Option<Pacer>,
}

impl BrowserFetcher {
    /// Launch a headless Chromium with automation signals suppressed.
    pub async fn launch(
        identity: Arc<dyn IdentityProvider>,
        timeout: Duration,
    ) -> Result<Self, RunError> {
        let chrome_path = find_chromium()
            .ok_or_else(|| RunError::Session("Chromium binary not found".to_string()))?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--window-size=1920,1080")
            .build()
            .map_err(|e| RunError::Session(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RunError::Session(format!("launch failed: {e}")))?;

        // Drain the CDP event stream for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            identity,
            timeout,
            interaction: None,
        })
    }

    /// Enable the human-like dwell-and-gesture sequence between navigation
    /// and HTML capture.
    pub fn with_interaction(mut self, pacer: Pacer) -> Self {
        self.interaction = Some(pacer);
        self
    }

    async fn drive(
        &self,
        page: &Page,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Document, FetchError> {
        let ua_override = SetUserAgentOverrideParams::builder()
            .user_agent(self.identity.user_agent())
            .build()
            .map_err(FetchError::Network)?;
        page.execute(ua_override)
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        match tokio::time::timeout(self.timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(FetchError::Network(e.to_string())),
            Err(_) => return Err(FetchError::Timeout(self.timeout)),
        }
        let _ = page.wait_for_navigation().await;

        // Detection scripts read navigator.webdriver early; overriding it
        // again after navigation still covers later polls.
        let _ = page.evaluate(WEBDRIVER_SPOOF).await;

        if let Some(pacer) = &self.interaction {
            pacer.pause(cancel).await?;
            let surface = PageSurface { page };
            pacer.simulate_interaction(&surface, cancel).await;
        }

        let html: String = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
            .into_value()
            .map_err(|e| FetchError::Network(format!("HTML capture: {e:?}")))?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());

        Ok(Document {
            url: final_url,
            // The protocol layer does not expose the response status.
            status: 200,
            body: html,
        })
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Document, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Network(format!("new page: {e}")))?;

        // The navigation timeout inside drive() does not cover the other
        // protocol calls; the outer deadline bounds the whole sequence so a
        // stalled connection cannot hang the fetch.
        let budget = self.timeout + DRIVE_OVERHEAD;
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            r = super::deadline(budget, self.drive(&page, url, cancel)) => r,
        };

        let _ = page.close().await;
        result
    }

    fn mode(&self) -> FetchMode {
        FetchMode::BrowserRendered
    }
}

/// Gesture surface over a live page, implemented with in-page JS so no
/// extra CDP domains are needed.
struct PageSurface<'a> {
    page: &'a Page,
}

fn mouse_move_js(x: i64, y: i64) -> String {
    format!(
        "document.dispatchEvent(new MouseEvent('mousemove', {{clientX: {x}, clientY: {y}, bubbles: true}}))"
    )
}

fn scroll_js(dy: i64) -> String {
    format!("window.scrollBy(0, {dy})")
}

#[async_trait]
impl InteractionSurface for PageSurface<'_> {
    async fn move_cursor(&self, x: i64, y: i64) -> Result<(), FetchError> {
        self.page
            .evaluate(mouse_move_js(x, y))
            .await
            .map(|_| ())
            .map_err(|e| FetchError::Network(e.to_string()))
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), FetchError> {
        self.page
            .evaluate(scroll_js(dy))
            .await
            .map(|_| ())
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}
