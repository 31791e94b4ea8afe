//! HTTP motivational quote lookup

use async_trait::async_trait;
use producer_config::QuotesConfig;
use producer_host_api::{HostError, HostResult, QuoteSource};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Body shape of the quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(rename = "quoteText")]
    quote_text: String,
}

/// Quote source backed by a JSON HTTP endpoint
pub struct HttpQuoteSource {
    client: Client,
    url: String,
}

impl HttpQuoteSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> HostResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| HostError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &QuotesConfig) -> HostResult<Self> {
        Self::new(config.url.clone(), config.timeout)
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_quote(&self) -> HostResult<String> {
        debug!(url = %self.url, "Fetching quote");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| HostError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostError::Fetch(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| HostError::Fetch(e.to_string()))?;

        parse_quote(&body)
    }
}

/// Extract the quote text from an endpoint response body
pub fn parse_quote(body: &str) -> HostResult<String> {
    let parsed: QuoteBody =
        serde_json::from_str(body).map_err(|e| HostError::Fetch(format!("Bad quote body: {}", e)))?;

    let quote = parsed.quote_text.trim();
    if quote.is_empty() {
        return Err(HostError::Fetch("Empty quote".into()));
    }
    Ok(quote.to_string())
}
