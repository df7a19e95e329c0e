//! All securities of one trade log.
//!
//! The portfolio owns one [`Stock`] per symbol, created when the symbol is
//! first seen. Records are routed in ingestion order and never re-sorted.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::capital_gain::GainCalculator;
use crate::error::LedgerError;
use crate::market_price::MarketPrice;
use crate::stock::Stock;
use crate::transaction::TransactionRecord;

/// A security whose holdings could not be valued.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingFailure {
    pub symbol: String,
    pub error: LedgerError,
}

#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    stocks: BTreeMap<String, Stock>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a record and queue it on its symbol's ledger.
    ///
    /// Records whose symbol starts with `#` are commented out and ignored.
    pub fn process_transaction(&mut self, record: TransactionRecord) -> Result<(), LedgerError> {
        if record.symbol.starts_with('#') {
            tracing::debug!("Skipping commented-out record {}", record.symbol);
            return Ok(());
        }
        record.validate()?;
        let stock = self
            .stocks
            .entry(record.symbol.clone())
            .or_insert_with(|| Stock::new(record.symbol.clone(), record.name.clone()));
        stock.put_transaction_to_queue(record)
    }

    /// Run lot matching on every security. The first integrity error aborts.
    pub fn realize_all(&mut self, calc: &GainCalculator<'_>) -> Result<(), LedgerError> {
        for stock in self.stocks.values_mut() {
            stock.realize_whole(calc)?;
        }
        Ok(())
    }

    /// Symbols that still hold delivery lots after realization.
    pub fn open_symbols(&self) -> Vec<String> {
        self.stocks
            .values()
            .filter(|s| s.has_open_delivery())
            .map(|s| s.symbol().to_string())
            .collect()
    }

    /// Value open lots of every security.
    ///
    /// A missing market price only affects its own security: those failures
    /// are collected and returned. Any other error aborts the run.
    pub fn hold_all(
        &mut self,
        calc: &GainCalculator<'_>,
        market: &dyn MarketPrice,
        today: NaiveDate,
    ) -> Result<Vec<HoldingFailure>, LedgerError> {
        let mut failures = Vec::new();
        for (symbol, stock) in self.stocks.iter_mut() {
            match stock.holding_whole(calc, market, today) {
                Ok(()) => {}
                Err(e) if e.is_external() => {
                    tracing::warn!("{}", e);
                    failures.push(HoldingFailure {
                        symbol: symbol.clone(),
                        error: e,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(failures)
    }

    pub fn stocks(&self) -> impl Iterator<Item = &Stock> {
        self.stocks.values()
    }

    pub fn get(&self, symbol: &str) -> Option<&Stock> {
        self.stocks.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}
