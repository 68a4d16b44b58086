//! Rate-limited proxy acquisition from an IP-rental API
//!
//! The provider keeps a small pool of credentials. A non-empty pool is reused
//! without freshness checks; the upstream API is only contacted when the pool
//! is empty and the minimum request interval has elapsed. Every failure
//! degrades to the configured fallback proxy, or to no proxy at all.

use super::ProxyCredential;
use crate::config::{ProxyConfig, ResponseFormat};
use crate::ConfigError;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors from one upstream proxy request
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxy API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("proxy API returned HTTP {0}")]
    Status(u16),

    #[error("proxy API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("proxy API returned no usable proxies")]
    Empty,

    #[error("malformed proxy API response: {0}")]
    Decode(String),
}

/// Resolved provider settings, with secrets pulled from the environment
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub enabled: bool,
    pub api_url: String,
    pub format: ResponseFormat,
    pub scheme: String,
    pub count: u32,
    pub app_key: String,
    pub app_secret: String,
    pub request_interval: Duration,
    pub timeout: Duration,
    pub fallback: Option<ProxyCredential>,
}

impl ProxySettings {
    /// Builds settings from the `[proxy]` section
    ///
    /// When proxies are enabled both secret variables must be set.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let fallback = match &config.fallback {
            Some(raw) => Some(
                ProxyCredential::parse(raw)
                    .ok_or_else(|| ConfigError::InvalidUrl(format!("proxy fallback {}", raw)))?,
            ),
            None => None,
        };

        let (app_key, app_secret) = if config.enabled {
            (
                read_secret(&config.key_env)?,
                read_secret(&config.secret_env)?,
            )
        } else {
            (String::new(), String::new())
        };

        Ok(Self {
            enabled: config.enabled,
            api_url: config.api_url.clone(),
            format: config.format,
            scheme: config.scheme.clone(),
            count: config.count,
            app_key,
            app_secret,
            request_interval: Duration::from_secs(config.request_interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
            fallback,
        })
    }

    /// Settings that never hand out a proxy
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            api_url: String::new(),
            format: ResponseFormat::Text,
            scheme: "http".to_string(),
            count: 0,
            app_key: String::new(),
            app_secret: String::new(),
            request_interval: Duration::ZERO,
            timeout: Duration::ZERO,
            fallback: None,
        }
    }
}

fn read_secret(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingSecret(var.to_string())),
    }
}

#[derive(Debug, Default)]
struct PoolState {
    pool: Vec<ProxyCredential>,
    last_request: Option<Instant>,
}

/// Supplies outbound proxy credentials
pub struct ProxyProvider {
    settings: ProxySettings,
    client: Client,
    state: Mutex<PoolState>,
}

impl ProxyProvider {
    pub fn new(settings: ProxySettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout.max(Duration::from_secs(1))).build()?;
        Ok(Self {
            settings,
            client,
            state: Mutex::new(PoolState::default()),
        })
    }

    /// A provider that always answers "no proxy"
    pub fn disabled() -> Self {
        Self {
            settings: ProxySettings::disabled(),
            client: Client::new(),
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Number of pooled credentials
    pub fn pool_size(&self) -> usize {
        self.lock().pool.len()
    }

    /// Returns a credential to use for the next fetch, if any
    ///
    /// Never fails: upstream problems are logged and degrade to the fallback
    /// proxy (or `None`).
    pub async fn get_credential(&self) -> Option<ProxyCredential> {
        if !self.settings.enabled {
            return None;
        }

        {
            let mut state = self.lock();
            if let Some(credential) = state.pool.choose(&mut rand::thread_rng()) {
                tracing::debug!("Using pooled proxy {}", credential);
                return Some(credential.clone());
            }

            let due = state
                .last_request
                .map_or(true, |at| at.elapsed() >= self.settings.request_interval);
            if !due {
                tracing::debug!("Proxy pool empty and refill throttled");
                return self.fallback();
            }

            // Claimed before the request so concurrent callers do not stampede
            state.last_request = Some(Instant::now());
        }

        match self.refresh().await {
            Ok(pool) => {
                tracing::info!("Fetched {} proxies from upstream", pool.len());
                let mut state = self.lock();
                state.pool = pool;
                state.pool.choose(&mut rand::thread_rng()).cloned()
            }
            Err(e) => {
                tracing::warn!("Proxy refresh failed: {}", e);
                self.fallback()
            }
        }
    }

    /// Performs one upstream request and parses the returned proxies
    pub async fn refresh(&self) -> Result<Vec<ProxyCredential>, ProxyError> {
        let count = self.settings.count.to_string();
        let params = [
            ("appKey", self.settings.app_key.as_str()),
            ("appSecret", self.settings.app_secret.as_str()),
            ("cnt", count.as_str()),
            ("wt", self.settings.format.as_param()),
            ("method", self.settings.scheme.as_str()),
        ];

        tracing::debug!("Requesting proxies from {}", self.settings.api_url);
        let response = self
            .client
            .get(&self.settings.api_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let auth = (!self.settings.app_key.is_empty())
            .then(|| (self.settings.app_key.as_str(), self.settings.app_secret.as_str()));
        parse_proxy_response(&body, &self.settings.scheme, auth)
    }

    fn fallback(&self) -> Option<ProxyCredential> {
        if let Some(fallback) = &self.settings.fallback {
            tracing::debug!("Using fallback proxy {}", fallback);
        }
        self.settings.fallback.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default, alias = "message")]
    msg: Option<String>,
    #[serde(default)]
    data: Vec<ApiEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    ip: String,
    port: Value,
}

/// Parses an upstream response body in either supported shape
///
/// A body starting with `{` is read as `{"code": 200, "data": [{"ip", "port"}]}`;
/// anything else as newline-delimited `host:port` entries. Entries that do
/// not parse are skipped. `auth` is attached to every credential.
pub fn parse_proxy_response(
    body: &str,
    scheme: &str,
    auth: Option<(&str, &str)>,
) -> Result<Vec<ProxyCredential>, ProxyError> {
    let trimmed = body.trim();

    let mut pool: Vec<ProxyCredential> = if trimmed.starts_with('{') {
        let response: ApiResponse =
            serde_json::from_str(trimmed).map_err(|e| ProxyError::Decode(e.to_string()))?;
        if response.code != 200 {
            return Err(ProxyError::Api {
                code: response.code,
                message: response.msg.unwrap_or_default(),
            });
        }
        response
            .data
            .iter()
            .filter_map(|entry| {
                let port = match &entry.port {
                    Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                }?;
                let host = entry.ip.trim();
                (!host.is_empty()).then(|| ProxyCredential::new(scheme, host, port))
            })
            .collect()
    } else {
        trimmed
            .lines()
            .filter_map(|line| ProxyCredential::from_host_port(line, scheme))
            .collect()
    };

    if pool.is_empty() {
        return Err(ProxyError::Empty);
    }

    if let Some((user, pass)) = auth {
        pool = pool
            .into_iter()
            .map(|credential| credential.with_auth(user, pass))
            .collect();
    }

    Ok(pool)
}
