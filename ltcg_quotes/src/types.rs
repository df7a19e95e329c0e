//! Response types for the exchange quote endpoints.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::{Error, ExchangeSymbol};

/// Response of the NSE `quote-equity` endpoint. Only the fields we read are modelled.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NseQuoteResponse {
    pub info: Option<NseInfo>,
    pub price_info: NsePriceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NseInfo {
    pub symbol: String,
    pub company_name: Option<String>,
}

/// `last_price` keeps the number's JSON text (serde_json `arbitrary_precision`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NsePriceInfo {
    pub last_price: serde_json::Number,
}

/// Response of the BSE `StockReachGraph` endpoint. `CurrVal` is a string.
#[derive(Debug, Deserialize)]
pub struct BseQuoteResponse {
    #[serde(rename = "CurrVal")]
    pub curr_val: String,
}

/// A last-traded price for one symbol, rounded to 3 decimal places.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: ExchangeSymbol,
    pub price: Decimal,
}

/// Parse a price from its decimal text form.
pub fn parse_price(raw: &str) -> Result<Decimal, Error> {
    let trimmed = raw.trim().replace(',', "");
    if trimmed.is_empty() {
        return Err(Error::ParseFailed("empty price".to_string()));
    }
    let price = Decimal::from_str(&trimmed)
        .or_else(|_| Decimal::from_scientific(&trimmed))
        .map_err(|e| Error::ParseFailed(format!("'{}': {}", trimmed, e)))?;
    if price <= Decimal::ZERO {
        return Err(Error::ParseFailed(format!("non-positive price {}", price)));
    }
    Ok(price.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero))
}
