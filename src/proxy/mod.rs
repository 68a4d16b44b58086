//! Outbound proxy supply

mod credential;
mod provider;

pub use credential::{ProxyAuth, ProxyCredential};
pub use provider::{parse_proxy_response, ProxyError, ProxyProvider, ProxySettings};
