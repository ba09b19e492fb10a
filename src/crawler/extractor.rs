//! Page extraction
//!
//! This module defines the `Extractor` seam the worker pool calls into and the
//! HTTP implementation used by the binary:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with content-type filtering
//! - Link and content extraction via the HTML parser

use crate::config::{ExtractorConfig, UserAgentConfig};
use crate::crawler::parser::parse_html;
use crate::crawler::result::{FetchResult, PageContent};
use crate::url::normalize_url;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

/// Turns a URL into a fetch result
///
/// Implementations are shared by every worker and may be called concurrently.
/// A failure of any kind is reported as `None`; timeouts are the
/// implementation's own business.
pub trait Extractor: Send + Sync {
    fn extract(&self, url: &str) -> impl Future<Output = Option<FetchResult>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use trawler::config::{ExtractorConfig, UserAgentConfig};
/// use trawler::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "Trawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &ExtractorConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    config: &ExtractorConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Extractor that fetches pages over HTTP and parses them as HTML
pub struct HttpExtractor {
    client: Client,
    capture_text: bool,
    capture_html: bool,
}

impl HttpExtractor {
    pub fn new(
        user_agent: &UserAgentConfig,
        config: &ExtractorConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(user_agent, config)?, config))
    }

    pub fn with_client(client: Client, config: &ExtractorConfig) -> Self {
        Self {
            client,
            capture_text: config.capture_text,
            capture_html: config.capture_html,
        }
    }

    /// Fetches `url`, returning the final URL and body of an HTML response
    async fn fetch_html(&self, url: &str) -> Option<(url::Url, String)> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    tracing::debug!("Request timeout for {}", url);
                } else if e.is_connect() {
                    tracing::debug!("Connection failed for {}: {}", url, e);
                } else {
                    tracing::debug!("Request failed for {}: {}", url, e);
                }
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("HTTP {} for {}", status.as_u16(), url);
            return None;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.contains("text/html") {
            tracing::debug!("Skipping {}: content type {:?}", url, content_type);
            return None;
        }

        let final_url = response.url().clone();
        match response.text().await {
            Ok(body) => Some((final_url, body)),
            Err(e) => {
                tracing::debug!("Failed to read body of {}: {}", url, e);
                None
            }
        }
    }
}

impl Extractor for HttpExtractor {
    async fn extract(&self, url: &str) -> Option<FetchResult> {
        let (final_url, body) = self.fetch_html(url).await?;
        let parsed = parse_html(&body, &final_url);

        let outlinks: Vec<String> = parsed
            .links
            .iter()
            .filter_map(|link| match normalize_url(link) {
                Ok(normalized) => Some(normalized.to_string()),
                Err(e) => {
                    tracing::trace!("Dropping outlink {}: {}", link, e);
                    None
                }
            })
            .collect();

        let content = PageContent {
            title: parsed.title,
            text: self.capture_text.then_some(parsed.text),
            html: self.capture_html.then_some(body),
        };

        Some(FetchResult::new(url, outlinks).with_content(content))
    }
}
