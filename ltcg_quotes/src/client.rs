//! HTTP client for the NSE and BSE public quote endpoints.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    types::{parse_price, BseQuoteResponse, NseQuoteResponse, Quote},
    user_agent::get_user_agent,
    Error, Exchange, ExchangeSymbol,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for current exchange quotes.
///
/// Sends browser-like headers with a randomized user agent. Each request
/// builds a fresh `reqwest::Client` with the configured timeout.
pub struct Client {
    /// Base URL for NSE. Defaults to `https://www.nseindia.com`.
    nse_base_url: String,
    /// Base URL for BSE. Defaults to `https://api.bseindia.com`.
    bse_base_url: String,
    timeout: Duration,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a client pointing at the production exchange endpoints.
    pub fn new() -> Self {
        Self {
            nse_base_url: "https://www.nseindia.com".to_string(),
            bse_base_url: "https://api.bseindia.com".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a client with one base URL for both exchanges. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            nse_base_url: base_url.to_string(),
            bse_base_url: base_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_url(&self, base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = Url::parse(format!("{}{}", base, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::RequestFailed
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get<T>(&self, url: Url, referer: &str) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let client = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(self.timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })?;
        let resp = client
            .get(url)
            .header("accept", "application/json, text/plain, */*")
            .header("accept-language", "en-US,en;q=0.9")
            .header("referer", referer)
            .header("x-requested-with", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to get quote: {}", e);
                Error::RequestFailed
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::RequestFailed
        })?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Exchange rate limited the request");
            return Err(Error::RateLimited);
        }

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse quote: {} | body: {}", e, snippet);
            Error::ParseFailed(e.to_string())
        })
    }

    /// Fetches the last traded price of an NSE-listed equity.
    pub async fn get_nse_quote(&self, code: &str) -> Result<Quote, Error> {
        let url = self.get_url(&self.nse_base_url, "/api/quote-equity", &[("symbol", code)])?;
        let resp: NseQuoteResponse = self
            .get(url, &format!("{}/get-quotes/equity?symbol={}", self.nse_base_url, code))
            .await?;
        let price = parse_price(&resp.price_info.last_price.to_string())?;
        Ok(Quote {
            symbol: ExchangeSymbol::new(Exchange::Nse, code),
            price,
        })
    }

    /// Fetches the current value of a BSE scrip by its numeric scrip code.
    pub async fn get_bse_quote(&self, scrip_code: &str) -> Result<Quote, Error> {
        let url = self.get_url(
            &self.bse_base_url,
            "/BseIndiaAPI/api/StockReachGraph/w",
            &[
                ("scripcode", scrip_code),
                ("flag", "0"),
                ("fromdate", ""),
                ("todate", ""),
                ("seriesid", ""),
            ],
        )?;
        let resp: BseQuoteResponse = self.get(url, "https://www.bseindia.com/").await?;
        let price = parse_price(&resp.curr_val)?;
        Ok(Quote {
            symbol: ExchangeSymbol::new(Exchange::Bse, scrip_code),
            price,
        })
    }

    /// Fetches a quote from whichever exchange the symbol is qualified with.
    pub async fn get_quote(&self, symbol: &ExchangeSymbol) -> Result<Quote, Error> {
        match symbol.exchange {
            Exchange::Nse => self.get_nse_quote(&symbol.code).await,
            Exchange::Bse => self.get_bse_quote(&symbol.code).await,
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
