//! Immutable ledger lines and the derived records built from them.
//!
//! A [`TransactionRecord`] is never modified once built. Partial matches
//! produce new records through [`TransactionRecord::scale_down`], and open
//! positions are valued through [`TransactionRecord::as_of_today_sell_equivalent`],
//! which turns an unrealized buy lot into a sell that the gain calculator
//! treats exactly like a realized one.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::precision::round3;

/// What a ledger line does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trade {
    Buy,
    Sell,
    Dividend,
    CashIn,
    CashOut,
}

impl Trade {
    /// Buy and Sell move shares; everything else is inert to lot matching.
    pub fn moves_shares(&self) -> bool {
        matches!(self, Trade::Buy | Trade::Sell)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trade::Buy => "Buy",
            Trade::Sell => "Sell",
            Trade::Dividend => "Dividend",
            Trade::CashIn => "CashIn",
            Trade::CashOut => "CashOut",
        }
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" => Ok(Trade::Buy),
            "sell" | "s" => Ok(Trade::Sell),
            "dividend" | "div" => Ok(Trade::Dividend),
            "cashin" | "cash_in" | "cash-in" => Ok(Trade::CashIn),
            "cashout" | "cash_out" | "cash-out" => Ok(Trade::CashOut),
            _ => Err(format!("'{}' is not a valid trade", s)),
        }
    }
}

/// How a Buy or Sell settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Intraday; bought and sold the same day.
    SquareOff,
    /// Taken into the demat account and held.
    Delivery,
    /// Cash movements and dividends.
    Cash,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::SquareOff => "sqr",
            Mode::Delivery => "del",
            Mode::Cash => "cash",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqr" | "squareoff" | "square-off" | "intraday" => Ok(Mode::SquareOff),
            "del" | "delivery" => Ok(Mode::Delivery),
            "cash" => Ok(Mode::Cash),
            _ => Err(format!("'{}' is not a valid mode", s)),
        }
    }
}

/// One line of the trade log.
///
/// Monetary fields carry 3 decimal places. For sells `receivable` is
/// `value - (brokerage + stt + charges)`; for buys it is the net cost
/// reference as it appeared in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub symbol: String,
    pub name: String,
    pub trade: Trade,
    pub mode: Mode,
    pub date: NaiveDate,
    pub shares: u64,
    pub price: Decimal,
    pub value: Decimal,
    pub brokerage: Decimal,
    pub stt: Decimal,
    pub charges: Decimal,
    pub receivable: Decimal,
}

impl TransactionRecord {
    /// Sum of the three charge fields.
    pub fn total_charges(&self) -> Decimal {
        self.brokerage + self.stt + self.charges
    }

    /// True when any monetary field other than the unit price is non-zero.
    pub fn has_monetary_residue(&self) -> bool {
        !(self.value.is_zero()
            && self.brokerage.is_zero()
            && self.stt.is_zero()
            && self.charges.is_zero()
            && self.receivable.is_zero())
    }

    /// Sanity checks applied to every record entering a portfolio.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let invalid = |reason: &str| LedgerError::InvalidRecord {
            symbol: self.symbol.clone(),
            reason: reason.to_string(),
        };

        if self.symbol.trim().is_empty() {
            return Err(invalid("symbol is empty"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if !self.trade.moves_shares() {
            return Ok(());
        }
        if self.mode == Mode::Cash {
            return Err(LedgerError::InvalidMode {
                symbol: self.symbol.clone(),
                trade: self.trade,
                mode: self.mode,
            });
        }
        if self.price <= Decimal::ZERO {
            return Err(invalid("price must be positive"));
        }
        if self.brokerage < Decimal::ZERO {
            return Err(invalid("brokerage is negative"));
        }
        if self.stt < Decimal::ZERO {
            return Err(invalid("stt is negative"));
        }
        if self.charges < Decimal::ZERO {
            return Err(invalid("charges are negative"));
        }
        Ok(())
    }

    /// A copy of this record reduced to `remaining_shares`.
    ///
    /// Value and the three charges are scaled by `remaining_shares / shares`
    /// and rounded to 3 places; `receivable` is recomputed from the scaled
    /// figures. Price is unchanged.
    pub fn scale_down(&self, remaining_shares: u64) -> Result<Self, LedgerError> {
        if remaining_shares > self.shares {
            return Err(LedgerError::OverSplit {
                symbol: self.symbol.clone(),
                shares: self.shares,
                requested: remaining_shares,
            });
        }

        let ratio = if self.shares == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(remaining_shares) / Decimal::from(self.shares)
        };

        let value = round3(ratio * self.value);
        let brokerage = round3(ratio * self.brokerage);
        let stt = round3(ratio * self.stt);
        let charges = round3(ratio * self.charges);
        let receivable = round3(value - (brokerage + stt + charges));

        Ok(Self {
            shares: remaining_shares,
            value,
            brokerage,
            stt,
            charges,
            receivable,
            ..self.clone()
        })
    }

    /// The sell this lot would be if it were closed at `market_price` on
    /// `reference_date`, with no charges.
    pub fn as_of_today_sell_equivalent(
        &self,
        reference_date: NaiveDate,
        market_price: Decimal,
    ) -> Self {
        let value = round3(Decimal::from(self.shares) * market_price);
        Self {
            trade: Trade::Sell,
            date: reference_date,
            price: market_price,
            value,
            brokerage: Decimal::ZERO,
            stt: Decimal::ZERO,
            charges: Decimal::ZERO,
            receivable: value,
            ..self.clone()
        }
    }
}
