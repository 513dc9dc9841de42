//! HTTP Client Factory
//!
//! Builds the reqwest clients shared by the completion providers and the
//! platform oracles.

use super::types::{LlmError, LlmResult};

/// Options for building a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpClientOptions {
    /// Proxy URL (`http://`, `https://` or `socks5://`). `None` disables
    /// proxies entirely, ignoring env vars.
    pub proxy_url: Option<String>,
    /// Skip TLS certificate verification (self-signed search heads).
    pub accept_invalid_certs: bool,
}

/// Build a `reqwest::Client` from the given options.
pub fn build_http_client(options: &HttpClientOptions) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    match options.proxy_url.as_deref() {
        Some(url) => {
            let proxy = reqwest::Proxy::all(url).map_err(|e| LlmError::ProviderUnavailable {
                message: format!("Invalid proxy URL {}: {}", url, e),
            })?;
            builder = builder.proxy(proxy);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    if options.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build().map_err(|e| LlmError::ProviderUnavailable {
        message: format!("Failed to build HTTP client: {}", e),
    })
}
