//! Quote sources: the trait the engine polls and the Yahoo Finance client.

use crate::error::QuoteError;
use crate::models::{Quote, QuoteMap};
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const YAHOO_FINANCE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

/// Symbols per request; larger sets are split and fetched concurrently.
const MAX_SYMBOLS_PER_REQUEST: usize = 50;

/// Yahoo rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Anything that can price a set of symbols.
///
/// Partial results are allowed: a symbol missing from the returned map is
/// "unknown this time", not an error. A wholesale failure is an `Err`.
pub trait QuoteSource: Send + Sync {
    fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> impl Future<Output = Result<QuoteMap, QuoteError>> + Send;
}

impl<S: QuoteSource> QuoteSource for Arc<S> {
    fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> impl Future<Output = Result<QuoteMap, QuoteError>> + Send {
        (**self).fetch_quotes(symbols)
    }
}

/// Fetch with an upper bound on how long the source may take.
pub async fn fetch_with_timeout<S: QuoteSource>(
    source: &S,
    symbols: &[String],
    limit: Duration,
) -> Result<QuoteMap, QuoteError> {
    match tokio::time::timeout(limit, source.fetch_quotes(symbols)).await {
        Ok(result) => result,
        Err(_) => Err(QuoteError::Timeout(limit)),
    }
}

/// Yahoo Finance API client.
pub struct YahooFinanceClient {
    client: Client,
    timeout: Duration,
}

impl YahooFinanceClient {
    pub fn new(timeout_secs: u64) -> Result<Self, QuoteError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn quote_url(symbols: &[String]) -> String {
        let joined = symbols.join(",");
        format!("{}?symbols={}", YAHOO_FINANCE_URL, urlencoding::encode(&joined))
    }

    async fn fetch_batch(&self, symbols: &[String]) -> Result<QuoteMap, QuoteError> {
        let response = self
            .client
            .get(Self::quote_url(symbols))
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status(response.status()));
        }

        let data: YahooResponse = response
            .json()
            .await
            .map_err(|e| QuoteError::Decode(e.to_string()))?;

        Ok(data
            .quote_response
            .result
            .into_iter()
            .filter_map(YahooQuote::into_quote)
            .map(|q| (q.symbol.clone(), q))
            .collect())
    }
}

impl QuoteSource for YahooFinanceClient {
    /// Batches that fail leave their symbols unknown; only a failure of
    /// every batch is reported as an error.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteMap, QuoteError> {
        if symbols.is_empty() {
            return Ok(QuoteMap::new());
        }

        let results = join_all(
            symbols
                .chunks(MAX_SYMBOLS_PER_REQUEST)
                .map(|batch| self.fetch_batch(batch)),
        )
        .await;

        let mut quotes = QuoteMap::new();
        let mut last_error = None;
        for result in results {
            match result {
                Ok(batch) => quotes.extend(batch),
                Err(e) => {
                    tracing::warn!(error = %e, "quote batch failed");
                    last_error = Some(e);
                }
            }
        }

        if quotes.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        tracing::debug!(requested = symbols.len(), received = quotes.len(), "fetched quotes");
        Ok(quotes)
    }
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooResponse {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuote {
    symbol: String,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_change: Option<f64>,
    #[serde(default)]
    regular_market_change_percent: Option<f64>,
    #[serde(default)]
    regular_market_time: Option<i64>,
}

impl YahooQuote {
    /// A result without a usable price counts as "unknown".
    fn into_quote(self) -> Option<Quote> {
        let price = self.regular_market_price.filter(|p| p.is_finite())?;
        Some(Quote {
            symbol: self.symbol.to_ascii_uppercase(),
            name: self.short_name.or(self.long_name),
            price,
            change: self.regular_market_change.unwrap_or(0.0),
            change_percent: self.regular_market_change_percent.unwrap_or(0.0),
            timestamp: self
                .regular_market_time
                .and_then(|t| Utc.timestamp_opt(t, 0).single())
                .unwrap_or_else(Utc::now),
        })
    }
}
