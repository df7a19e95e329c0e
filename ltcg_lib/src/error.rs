//! Error types for the gains engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::transaction::{Mode, Trade};

/// A malformed field in user-supplied input.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid input: {0}")]
pub struct InvalidInput(pub String);

/// Errors from a market price lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceError {
    #[error("no market price available for {0}")]
    Missing(String),
    #[error("market price for {symbol} unavailable: {reason}")]
    Unavailable { symbol: String, reason: String },
}

/// Errors raised while matching lots and computing gains.
///
/// Everything except [`LedgerError::MarketPrice`] is an input-integrity
/// failure: the transaction log contradicts itself and the run must stop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid record for {symbol}: {reason}")]
    InvalidRecord { symbol: String, reason: String },

    #[error("{symbol}: {trade} record cannot use mode '{mode}'")]
    InvalidMode {
        symbol: String,
        trade: Trade,
        mode: Mode,
    },

    #[error("pop from an empty transaction queue")]
    QueueUnderflow,

    #[error("{symbol}: sell of {shares} shares on {date} has no buy lot left to match")]
    UnmatchedSell {
        symbol: String,
        date: NaiveDate,
        shares: u64,
    },

    #[error("{symbol}: {shares} square-off shares in {lots} lot(s) left unsold")]
    ResidualSquareOff {
        symbol: String,
        lots: usize,
        shares: u64,
    },

    #[error("{symbol}: zero-share record dated {date} still carries value {value}")]
    ZeroShareResidue {
        symbol: String,
        date: NaiveDate,
        value: Decimal,
    },

    #[error("{symbol}: cannot split {requested} shares out of a {shares}-share record")]
    OverSplit {
        symbol: String,
        shares: u64,
        requested: u64,
    },

    #[error("{symbol}: sell has {sell_shares} shares but buy has {buy_shares}")]
    ShareMismatch {
        symbol: String,
        sell_shares: u64,
        buy_shares: u64,
    },

    #[error("{symbol}: sell dated {sell_date} precedes its buy dated {buy_date}")]
    SellBeforeBuy {
        symbol: String,
        buy_date: NaiveDate,
        sell_date: NaiveDate,
    },

    #[error("no cutover reference price for {0}")]
    MissingReferencePrice(String),

    #[error("{symbol}: cannot value holdings")]
    MarketPrice {
        symbol: String,
        #[source]
        source: PriceError,
    },
}

impl LedgerError {
    /// Whether the failure comes from an external price source rather than the log itself.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::MarketPrice { .. })
    }
}
