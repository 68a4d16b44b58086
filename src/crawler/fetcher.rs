//! Page fetching with bounded retries
//!
//! This module handles every network read of a page:
//! - The [`PageBackend`] seam over the transport (plain HTTP or a headless browser)
//! - Building reqwest clients with browser-like headers and an optional proxy
//! - Retry with linear backoff and backend reset on transport errors
//! - Admission through the shared concurrency gate

use super::scheduler::{AdmissionGate, RetryPolicy};
use crate::config::UserAgentConfig;
use crate::proxy::ProxyCredential;
use crate::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// How a page should be retrieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    /// Raw server response
    Static,

    /// Page rendered by a browser, optionally waiting for a selector and
    /// running a script (e.g. scrolling) before the markup is read
    Rendered {
        wait_for: Option<String>,
        script: Option<String>,
    },
}

/// A single page to retrieve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub mode: FetchMode,
}

impl FetchRequest {
    pub fn static_page(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: FetchMode::Static,
        }
    }

    pub fn rendered(url: impl Into<String>, wait_for: Option<&str>, script: Option<&str>) -> Self {
        Self {
            url: url.into(),
            mode: FetchMode::Rendered {
                wait_for: wait_for.map(str::to_string),
                script: script.map(str::to_string),
            },
        }
    }

    /// Same mode, different URL
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: self.mode.clone(),
        }
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            FetchMode::Static => write!(f, "{}", self.url),
            FetchMode::Rendered { .. } => write!(f, "{} (rendered)", self.url),
        }
    }
}

/// Boxed future returned by [`PageBackend::fetch`]
pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;

/// Transport that turns a request into raw markup
pub trait PageBackend: Send + Sync {
    /// Performs one attempt; no retries happen at this level
    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
        proxy: Option<&'a ProxyCredential>,
    ) -> BackendFuture<'a>;

    /// Drops any session state so the next attempt starts clean
    fn reset(&self) {}
}

/// All attempts of a fetch failed
#[derive(Debug, Clone, Error)]
#[error("fetch of {url} failed after {attempts} attempt(s): {last}")]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub last: FetchError,
}

/// Builds an HTTP client with browser-like headers
///
/// # Arguments
///
/// * `user_agent` - Identification headers
/// * `timeout` - Whole-request timeout
/// * `proxy` - Optional outbound proxy; credentials in its URL are used for basic auth
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
    proxy: Option<&ProxyCredential>,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(language) = HeaderValue::from_str(&user_agent.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    let mut builder = Client::builder()
        .user_agent(user_agent.value.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy.connection_url())?);
    }

    builder.build()
}

/// Static retrieval over reqwest
///
/// One client is kept per proxy so connections are reused between pages.
/// Rendered requests are served statically; rendering needs the `browser`
/// feature.
pub struct HttpBackend {
    user_agent: UserAgentConfig,
    timeout: Duration,
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl HttpBackend {
    pub fn new(user_agent: UserAgentConfig, timeout: Duration) -> Self {
        Self {
            user_agent,
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, proxy: Option<&ProxyCredential>) -> Result<Client, FetchError> {
        let key = proxy.map(ProxyCredential::connection_url);
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = build_http_client(&self.user_agent, self.timeout, proxy)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    async fn get(&self, request: &FetchRequest, proxy: Option<&ProxyCredential>) -> Result<String, FetchError> {
        if let FetchMode::Rendered { .. } = request.mode {
            tracing::debug!("No renderer compiled in, fetching {} statically", request.url);
        }

        let client = self.client_for(proxy)?;
        let response = client
            .get(&request.url)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(classify_error)
    }
}

impl PageBackend for HttpBackend {
    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
        proxy: Option<&'a ProxyCredential>,
    ) -> BackendFuture<'a> {
        Box::pin(self.get(request, proxy))
    }

    fn reset(&self) {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e.to_string())
    }
}

/// Retrieves pages through a backend with retry and admission control
pub struct FetchClient {
    backend: Arc<dyn PageBackend>,
    gate: AdmissionGate,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(backend: Arc<dyn PageBackend>, gate: AdmissionGate, policy: RetryPolicy) -> Self {
        Self {
            backend,
            gate,
            policy,
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches a page, retrying up to the policy's attempt limit
    ///
    /// A non-2xx status or a blank body counts as a failed attempt. After
    /// failed attempt `i` the client sleeps `i * base_delay`. A slot of the
    /// admission gate is held only while an attempt is in flight.
    pub async fn fetch(
        &self,
        request: &FetchRequest,
        proxy: Option<&ProxyCredential>,
    ) -> Result<String, FetchFailure> {
        let max_attempts = self.policy.max_attempts;
        let mut last = FetchError::EmptyBody;

        for attempt in 1..=max_attempts {
            let result = {
                let _permit = self.gate.admit().await;
                self.backend.fetch(request, proxy).await
            };

            match result {
                Ok(body) if !body.trim().is_empty() => {
                    tracing::trace!("Fetched {} ({} bytes)", request, body.len());
                    return Ok(body);
                }
                Ok(_) => last = FetchError::EmptyBody,
                Err(e) => last = e,
            }

            tracing::warn!(
                "Attempt {}/{} for {} failed: {}",
                attempt,
                max_attempts,
                request,
                last
            );

            if last.is_transport() {
                self.backend.reset();
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.backoff(attempt)).await;
            }
        }

        Err(FetchFailure {
            url: request.url.clone(),
            attempts: max_attempts,
            last,
        })
    }
}
