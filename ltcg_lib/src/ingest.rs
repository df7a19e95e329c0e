//! Trade log CSV ingestion.
//!
//! Expected header:
//! `symbol,name,trade,date,shares,price,value,brokerage,stt,charges,receivable,mode`
//!
//! Rows are returned in file order. Rows whose symbol starts with `#` are
//! treated as commented out.

use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::error::{InvalidInput, LedgerError};
use crate::precision::round3;
use crate::symbol_alias::SymbolAliases;
use crate::transaction::{Mode, Trade, TransactionRecord};
use crate::validation::{
    parse_amount, parse_shares, sanitize_text, validate_date, validate_name, validate_symbol,
    MAX_NAME_LENGTH,
};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read trade log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed trade log CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {source}")]
    Field {
        row: usize,
        #[source]
        source: InvalidInput,
    },
    #[error("row {row}: {source}")]
    Record {
        row: usize,
        #[source]
        source: LedgerError,
    },
}

impl IngestError {
    /// 1-based data row the error refers to, when known.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::Field { row, .. } | Self::Record { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// One CSV row as text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub trade: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub shares: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub brokerage: String,
    #[serde(default)]
    pub stt: String,
    #[serde(default)]
    pub charges: String,
    #[serde(default)]
    pub receivable: String,
    #[serde(default)]
    pub mode: String,
}

impl RawTransaction {
    pub fn is_comment(&self) -> bool {
        self.symbol.trim_start().starts_with('#')
    }

    /// Convert to a typed record.
    ///
    /// Dividend and cash rows may leave numeric fields and mode blank, and
    /// their symbol may be a plain ledger name such as `Capital`. For buys
    /// and sells a blank `value` is `shares * price` and a blank
    /// `receivable` is derived from value and charges.
    pub fn into_record(self, aliases: &SymbolAliases) -> Result<TransactionRecord, InvalidInput> {
        let trade: Trade = self.trade.parse().map_err(InvalidInput)?;
        let inert = !trade.moves_shares();
        let symbol = match validate_symbol(&self.symbol) {
            Ok(symbol) => aliases.normalize(&symbol),
            Err(_) if inert => sanitize_text(&self.symbol, MAX_NAME_LENGTH)?,
            Err(e) => return Err(e),
        };
        let name = validate_name(&self.name)?;
        let date = validate_date(&self.date)?;

        let mode = if self.mode.trim().is_empty() && inert {
            Mode::Cash
        } else {
            self.mode.parse::<Mode>().map_err(InvalidInput)?
        };

        let amount = |raw: &str, field: &str| -> Result<Option<Decimal>, InvalidInput> {
            if raw.trim().is_empty() {
                Ok(None)
            } else {
                parse_amount(raw, field).map(Some)
            }
        };
        let required = |raw: &str, field: &str| -> Result<Decimal, InvalidInput> {
            match amount(raw, field)? {
                Some(v) => Ok(v),
                None if inert => Ok(Decimal::ZERO),
                None => Err(InvalidInput(format!("{} is required for a {}", field, trade))),
            }
        };

        let shares = if self.shares.trim().is_empty() && inert {
            0
        } else {
            parse_shares(&self.shares)?
        };
        let price = required(&self.price, "price")?;
        let brokerage = amount(&self.brokerage, "brokerage")?.unwrap_or_default();
        let stt = amount(&self.stt, "stt")?.unwrap_or_default();
        let charges = amount(&self.charges, "charges")?.unwrap_or_default();
        let value = match amount(&self.value, "value")? {
            Some(v) => v,
            None => round3(Decimal::from(shares) * price),
        };
        let total_charges = brokerage + stt + charges;
        let receivable = match amount(&self.receivable, "receivable")? {
            Some(v) => v,
            None => match trade {
                Trade::Buy => round3(value + total_charges),
                Trade::Sell => round3(value - total_charges),
                Trade::Dividend | Trade::CashIn | Trade::CashOut => value,
            },
        };

        Ok(TransactionRecord {
            symbol,
            name,
            trade,
            mode,
            date,
            shares,
            price,
            value,
            brokerage,
            stt,
            charges,
            receivable,
        })
    }
}

/// Read and validate every record of a trade log.
pub fn read_transactions<R: Read>(
    reader: R,
    aliases: &SymbolAliases,
) -> Result<Vec<TransactionRecord>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (idx, row) in rdr.deserialize::<RawTransaction>().enumerate() {
        let row_no = idx + 1;
        let raw = row?;
        if raw.is_comment() {
            tracing::debug!("Skipping comment row {}", row_no);
            continue;
        }
        let record = raw
            .into_record(aliases)
            .map_err(|source| IngestError::Field { row: row_no, source })?;
        record
            .validate()
            .map_err(|source| IngestError::Record { row: row_no, source })?;
        records.push(record);
    }

    tracing::info!("Read {} transaction(s)", records.len());
    Ok(records)
}

/// Read a trade log from disk. See [`read_transactions`].
pub fn read_transactions_file(
    path: &Path,
    aliases: &SymbolAliases,
) -> Result<Vec<TransactionRecord>, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_transactions(file, aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_alias::load_symbol_aliases;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const HEADER: &str = "symbol,name,trade,date,shares,price,value,brokerage,stt,charges,receivable,mode\n";

    fn read(body: &str) -> Result<Vec<TransactionRecord>, IngestError> {
        let aliases = load_symbol_aliases().unwrap();
        read_transactions(format!("{}{}", HEADER, body).as_bytes(), &aliases)
    }

    #[test]
    fn reads_full_rows() {
        let records = read(
            "NSE:INFY,Infosys,Buy,2018-01-01,10,100,1000,5,0,0,1005,del\n\
             NSE:INFY,Infosys,Sell,01-06-2019,10,150,1500,3,1,1,1495,del\n",
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        let sell = &records[1];
        assert_eq!(sell.trade, Trade::Sell);
        assert_eq!(sell.mode, Mode::Delivery);
        assert_eq!(sell.date, NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
        assert_eq!(sell.total_charges(), dec!(5));
        assert_eq!(sell.receivable, dec!(1495));
    }

    #[test]
    fn normalizes_bom_prefix_and_case() {
        let records = read("bom:500209,Infosys,buy,2018-01-01,1,100,100,0,0,0,100,DELIVERY\n").unwrap();
        assert_eq!(records[0].symbol, "BSE:500209");
        assert_eq!(records[0].trade, Trade::Buy);
    }

    #[test]
    fn derives_blank_value_and_receivable() {
        let records = read("NSE:TCS,TCS,Sell,2020-01-01,3,33.3335,,1,,,,sqr\n").unwrap();
        let r = &records[0];
        assert_eq!(r.price, dec!(33.334));
        assert_eq!(r.value, dec!(100.002));
        assert_eq!(r.receivable, dec!(99.002));
        assert_eq!(r.mode, Mode::SquareOff);
    }

    #[test]
    fn inert_rows_may_leave_numbers_blank() {
        let records = read(
            "NSE:ITC,ITC,Dividend,2020-07-01,,,525.5,,,,,\n\
             NSE:ITC,ITC,CashIn,2020-07-02,,,,,,,,cash\n",
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].trade, Trade::Dividend);
        assert_eq!(records[0].mode, Mode::Cash);
        assert_eq!(records[0].value, dec!(525.5));
        assert_eq!(records[0].shares, 0);
        assert_eq!(records[1].value, dec!(0));
    }

    #[test]
    fn cash_rows_accept_a_plain_ledger_symbol() {
        let records = read(
            "Capital,Capital,CashIn,2018-01-01,,,100000,,,,,cash\n\
             NSE:INFY,Infosys,Buy,2018-01-02,10,100,1000,0,0,0,1000,del\n",
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol, "Capital");
        assert_eq!(records[0].trade, Trade::CashIn);
        assert_eq!(records[0].value, dec!(100000));
        assert_eq!(records[1].symbol, "NSE:INFY");
    }

    #[test]
    fn plain_symbol_on_a_buy_is_rejected() {
        let err = read("Capital,Capital,Buy,2018-01-01,1,10,10,0,0,0,10,del\n").unwrap_err();
        assert!(matches!(err, IngestError::Field { row: 1, .. }));
        assert!(err.to_string().contains("EXCHANGE:CODE"));
    }

    #[test]
    fn comment_rows_are_skipped() {
        let records = read(
            "#NSE:INFY,Infosys,Buy,not-a-date,x,y,z,,,,,del\n\
             NSE:TCS,TCS,Buy,2020-01-01,1,10,10,0,0,0,10,del\n",
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "NSE:TCS");
    }

    #[test]
    fn field_errors_carry_row_number() {
        let err = read(
            "NSE:TCS,TCS,Buy,2020-01-01,1,10,10,0,0,0,10,del\n\
             NSE:TCS,TCS,Gift,2020-01-02,1,10,10,0,0,0,10,del\n",
        )
        .unwrap_err();
        assert_eq!(err.row(), Some(2));
        assert!(err.to_string().contains("Gift"));
    }

    #[test]
    fn missing_price_on_buy_is_rejected() {
        let err = read("NSE:TCS,TCS,Buy,2020-01-01,1,,10,0,0,0,10,del\n").unwrap_err();
        assert!(matches!(err, IngestError::Field { row: 1, .. }));
    }

    #[test]
    fn cash_mode_on_buy_is_a_record_error() {
        let err = read("NSE:TCS,TCS,Buy,2020-01-01,1,10,10,0,0,0,10,cash\n").unwrap_err();
        assert!(matches!(
            err,
            IngestError::Record {
                row: 1,
                source: LedgerError::InvalidMode { .. }
            }
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let aliases = SymbolAliases::default();
        let err = read_transactions_file(Path::new("/nonexistent/trades.csv"), &aliases).unwrap_err();
        assert!(err.to_string().contains("trades.csv"));
        assert_eq!(err.row(), None);
    }
}
