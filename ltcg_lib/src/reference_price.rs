//! Cutover-date closing prices used to grandfather long-term gains.
//!
//! The table is built once from the exchanges' end-of-day files for the
//! cutover date (the bhavcopy CSVs) and then passed by reference into the
//! gain calculator. Keys are exchange-qualified symbols (`NSE:INFY`).

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use ltcg_quotes::Exchange;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::precision::round4;

/// Errors from loading a cutover price file.
#[derive(Error, Debug)]
pub enum ReferencePriceError {
    #[error("Failed to read reference prices from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed reference price CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Row {row} has no column {column}")]
    MissingColumn { row: usize, column: usize },
    #[error("Row {row} has invalid price '{value}'")]
    InvalidPrice { row: usize, value: String },
}

/// Source of the cutover-date price for a symbol.
pub trait ReferencePrice {
    fn reference_price(&self, symbol: &str) -> Option<Decimal>;
}

impl ReferencePrice for HashMap<String, Decimal> {
    fn reference_price(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol).copied()
    }
}

/// In-memory cutover price table keyed by `EXCHANGE:CODE`.
#[derive(Debug, Clone, Default)]
pub struct ReferencePriceTable {
    prices: HashMap<String, Decimal>,
}

impl ReferencePriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, price: Decimal) {
        self.prices.insert(symbol.into(), round4(price));
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Load an end-of-day CSV (with a header row) for one exchange.
    ///
    /// `symbol_column` holds the bare exchange code and `price_column` the
    /// closing price; prices are kept to 4 decimal places. Later rows and
    /// later files overwrite earlier entries for the same symbol. Returns the
    /// number of rows loaded.
    pub fn load_csv<R: Read>(
        &mut self,
        reader: R,
        exchange: Exchange,
        symbol_column: usize,
        price_column: usize,
    ) -> Result<usize, ReferencePriceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut loaded = 0;
        for (idx, row) in rdr.records().enumerate() {
            let row = row?;
            let row_no = idx + 1;
            let code = row.get(symbol_column).ok_or(ReferencePriceError::MissingColumn {
                row: row_no,
                column: symbol_column,
            })?;
            let raw_price = row.get(price_column).ok_or(ReferencePriceError::MissingColumn {
                row: row_no,
                column: price_column,
            })?;
            if code.is_empty() {
                continue;
            }
            let price: Decimal =
                raw_price
                    .parse()
                    .map_err(|_| ReferencePriceError::InvalidPrice {
                        row: row_no,
                        value: raw_price.to_string(),
                    })?;
            self.insert(format!("{}:{}", exchange, code.to_ascii_uppercase()), price);
            loaded += 1;
        }

        tracing::debug!("Loaded {} {} reference prices", loaded, exchange);
        Ok(loaded)
    }

    /// Load an end-of-day CSV from disk. See [`ReferencePriceTable::load_csv`].
    pub fn load_file(
        &mut self,
        path: &Path,
        exchange: Exchange,
        symbol_column: usize,
        price_column: usize,
    ) -> Result<usize, ReferencePriceError> {
        let file = std::fs::File::open(path).map_err(|source| ReferencePriceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_csv(file, exchange, symbol_column, price_column)
    }
}

impl ReferencePrice for ReferencePriceTable {
    fn reference_price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }
}
