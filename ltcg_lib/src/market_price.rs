//! Current market prices for valuing open positions.

use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::error::PriceError;

/// Source of the current price for a symbol.
pub trait MarketPrice {
    fn current_price(&self, symbol: &str) -> Result<Decimal, PriceError>;
}

/// Frozen set of fetched prices.
///
/// Filled concurrently by the quote fetcher, then read by the synchronous
/// engine. A symbol may hold either a price or the reason its fetch failed;
/// a later successful insert clears a recorded failure.
#[derive(Debug, Default)]
pub struct QuoteBook {
    prices: DashMap<String, Decimal>,
    failures: DashMap<String, String>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, symbol: impl Into<String>, price: Decimal) {
        let symbol = symbol.into();
        self.failures.remove(&symbol);
        self.prices.insert(symbol, price);
    }

    pub fn record_failure(&self, symbol: impl Into<String>, reason: impl Into<String>) {
        let symbol = symbol.into();
        if !self.prices.contains_key(&symbol) {
            self.failures.insert(symbol, reason.into());
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Recorded failures, sorted by symbol.
    pub fn failures(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .failures
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        out.sort();
        out
    }
}

impl MarketPrice for QuoteBook {
    fn current_price(&self, symbol: &str) -> Result<Decimal, PriceError> {
        if let Some(price) = self.prices.get(symbol) {
            return Ok(*price);
        }
        match self.failures.get(symbol) {
            Some(reason) => Err(PriceError::Unavailable {
                symbol: symbol.to_string(),
                reason: reason.value().clone(),
            }),
            None => Err(PriceError::Missing(symbol.to_string())),
        }
    }
}
