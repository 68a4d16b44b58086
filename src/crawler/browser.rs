//! Headless Chrome page backend
//!
//! Each attempt launches a short-lived browser so that an unauthenticated
//! proxy can be applied per request through `--proxy-server`. The browser and its CDP handler task
//! are torn down before the attempt returns.

use super::fetcher::{BackendFuture, FetchMode, FetchRequest, PageBackend};
use crate::proxy::ProxyCredential;
use crate::FetchError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Once;
use std::time::{Duration, Instant};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(200);

static AUTH_PROXY_WARNING: Once = Once::new();

/// Renders pages in headless Chrome
#[derive(Debug, Clone)]
pub struct BrowserBackend {
    user_agent: String,
    timeout: Duration,
    wait_limit: Duration,
}

impl BrowserBackend {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            timeout,
            wait_limit: timeout.min(Duration::from_secs(10)),
        }
    }

    async fn render(
        &self,
        request: &FetchRequest,
        proxy: Option<&ProxyCredential>,
    ) -> Result<String, FetchError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.timeout)
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-sandbox")
            .arg("--mute-audio");

        if let Some(arg) = proxy_server_arg(proxy) {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(FetchError::Render)?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
        });

        let result = tokio::time::timeout(self.timeout, self.load(&browser, request)).await;

        if let Err(e) = browser.close().await {
            tracing::debug!("Closing browser failed: {}", e);
        }
        handler_task.abort();

        match result {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    async fn load(&self, browser: &Browser, request: &FetchRequest) -> Result<String, FetchError> {
        let page = browser
            .new_page(request.url.as_str())
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;

        if let FetchMode::Rendered { wait_for, script } = &request.mode {
            if let Some(selector) = wait_for {
                self.wait_for_selector(&page, selector).await;
            }
            if let Some(script) = script {
                if let Err(e) = page.evaluate(script.as_str()).await {
                    tracing::debug!("Post-load script failed on {}: {}", request.url, e);
                }
            }
        }

        page.content()
            .await
            .map_err(|e| FetchError::Render(e.to_string()))
    }

    /// Polls for the selector; a missing selector is not an error, the page
    /// is read as it is once the wait limit passes
    async fn wait_for_selector(&self, page: &Page, selector: &str) {
        let started = Instant::now();
        loop {
            if page.find_element(selector).await.is_ok() {
                tracing::trace!("Selector {} appeared after {:?}", selector, started.elapsed());
                return;
            }
            if started.elapsed() >= self.wait_limit {
                tracing::debug!("Selector {} not found within {:?}", selector, self.wait_limit);
                return;
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }
}

impl PageBackend for BrowserBackend {
    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
        proxy: Option<&'a ProxyCredential>,
    ) -> BackendFuture<'a> {
        Box::pin(self.render(request, proxy))
    }
}

/// Chrome ignores credentials in `--proxy-server` and would answer every
/// request with 407, so authenticated proxies are skipped and the page is
/// rendered over a direct connection
fn proxy_server_arg(proxy: Option<&ProxyCredential>) -> Option<String> {
    let proxy = proxy?;
    if proxy.auth.is_some() {
        AUTH_PROXY_WARNING.call_once(|| {
            tracing::warn!("Rendered fetches cannot authenticate to the proxy pool; rendering directly");
        });
        tracing::debug!("Not passing authenticated proxy {} to the browser", proxy);
        return None;
    }
    Some(format!("--proxy-server={}", proxy.server_address()))
}
