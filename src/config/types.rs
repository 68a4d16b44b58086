use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Job-Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(rename = "platform", default)]
    pub platforms: Vec<PlatformEntry>,
}

/// Scraping behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Maximum number of simultaneous in-flight fetches
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Attempts per fetch before giving up
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit; attempt `i` waits `i * retry-base-delay-ms`
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Per-request timeout inside the fetch backend (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Wall-clock bound on one detail enrichment (seconds)
    #[serde(rename = "detail-timeout-secs", default = "default_detail_timeout_secs")]
    pub detail_timeout_secs: u64,

    /// Aggregate page deadline per candidate (seconds)
    #[serde(
        rename = "per-candidate-budget-secs",
        default = "default_per_candidate_budget_secs"
    )]
    pub per_candidate_budget_secs: u64,

    /// Sleep between listing pages (milliseconds)
    #[serde(rename = "rate-limit-ms", default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Page cap per platform; 0 means unlimited
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Whole-page retries after a listing page fetch is exhausted
    #[serde(rename = "page-retries", default = "default_page_retries")]
    pub page_retries: u32,

    /// Use the headless browser backend when it is compiled in
    #[serde(default)]
    pub render: bool,
}

impl ScraperConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    pub fn per_candidate_budget(&self) -> Duration {
        Duration::from_secs(self.per_candidate_budget_secs)
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            detail_timeout_secs: default_detail_timeout_secs(),
            per_candidate_budget_secs: default_per_candidate_budget_secs(),
            rate_limit_ms: default_rate_limit_ms(),
            max_pages: default_max_pages(),
            page_retries: default_page_retries(),
            render: false,
        }
    }
}

/// Browser identification sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_user_agent")]
    pub value: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one `<platform>.json` per platform
    pub directory: String,

    /// Optional combined file name written inside `directory`
    #[serde(rename = "combined-file", default = "default_combined_file")]
    pub combined_file: Option<String>,
}

/// Shape of the proxy API response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Json,
    Text,
}

impl ResponseFormat {
    /// Value of the API's `wt` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

/// Proxy rental API configuration
///
/// Credentials are never stored in the file: `key-env` and `secret-env`
/// name the environment variables holding them.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(rename = "api-url", default = "default_proxy_api_url")]
    pub api_url: String,

    #[serde(default = "default_proxy_format")]
    pub format: ResponseFormat,

    /// Scheme of the handed-out proxies
    #[serde(default = "default_proxy_scheme")]
    pub scheme: String,

    /// Proxies requested per upstream call
    #[serde(default = "default_proxy_count")]
    pub count: u32,

    #[serde(rename = "key-env", default = "default_key_env")]
    pub key_env: String,

    #[serde(rename = "secret-env", default = "default_secret_env")]
    pub secret_env: String,

    /// Minimum seconds between upstream requests
    #[serde(rename = "request-interval-secs", default = "default_request_interval_secs")]
    pub request_interval_secs: u64,

    #[serde(rename = "timeout-secs", default = "default_proxy_timeout_secs")]
    pub timeout_secs: u64,

    /// Static proxy URL used when the pool is empty and refills are throttled
    #[serde(default)]
    pub fallback: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_proxy_api_url(),
            format: default_proxy_format(),
            scheme: default_proxy_scheme(),
            count: default_proxy_count(),
            key_env: default_key_env(),
            secret_env: default_secret_env(),
            request_interval_secs: default_request_interval_secs(),
            timeout_secs: default_proxy_timeout_secs(),
            fallback: None,
        }
    }
}

/// Per-platform selection and overrides
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformEntry {
    /// Platform identifier (`yuanjisong`, `sxsapi`)
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listing-page URL template containing `{page}`
    #[serde(rename = "list-url", default)]
    pub list_url: Option<String>,

    /// Page cap overriding `scraper.max-pages`
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,
}

fn default_max_concurrent_fetches() -> u32 {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_detail_timeout_secs() -> u64 {
    30
}

fn default_per_candidate_budget_secs() -> u64 {
    10
}

fn default_rate_limit_ms() -> u64 {
    2000
}

fn default_max_pages() -> u32 {
    5
}

fn default_page_retries() -> u32 {
    1
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "zh-CN,zh;q=0.9,en;q=0.8".to_string()
}

fn default_combined_file() -> Option<String> {
    Some("all_jobs.json".to_string())
}

fn default_proxy_api_url() -> String {
    "http://api.xiaoxiangdaili.com/ip/get".to_string()
}

fn default_proxy_format() -> ResponseFormat {
    ResponseFormat::Text
}

fn default_proxy_scheme() -> String {
    "http".to_string()
}

fn default_proxy_count() -> u32 {
    2
}

fn default_key_env() -> String {
    "JOB_TRAWL_PROXY_KEY".to_string()
}

fn default_secret_env() -> String {
    "JOB_TRAWL_PROXY_SECRET".to_string()
}

fn default_request_interval_secs() -> u64 {
    60
}

fn default_proxy_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}
