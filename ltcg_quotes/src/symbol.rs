//! Exchange-qualified symbols such as `NSE:INFY` or `BSE:500209`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Indian stock exchanges a quote can be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Nse,
    /// Also accepts the legacy `BOM` prefix.
    #[serde(alias = "BOM")]
    Bse,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::Bse => "BSE",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NSE" => Ok(Exchange::Nse),
            "BSE" | "BOM" => Ok(Exchange::Bse),
            other => Err(Error::InvalidSymbol(format!("unknown exchange '{}'", other))),
        }
    }
}

/// A security code qualified by the exchange it trades on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeSymbol {
    pub exchange: Exchange,
    pub code: String,
}

impl ExchangeSymbol {
    pub fn new(exchange: Exchange, code: impl Into<String>) -> Self {
        Self {
            exchange,
            code: code.into(),
        }
    }
}

impl fmt::Display for ExchangeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.code)
    }
}

impl FromStr for ExchangeSymbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (exchange, code) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidSymbol(s.to_string()))?;
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::InvalidSymbol(s.to_string()));
        }
        Ok(Self {
            exchange: exchange.parse()?,
            code: code.to_ascii_uppercase(),
        })
    }
}
