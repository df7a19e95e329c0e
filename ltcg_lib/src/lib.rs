//! Library layer for ltcg: the capital gains engine and its outer services.
//!
//! The engine (`transaction`, `queue`, `stock`, `capital_gain`, `portfolio`)
//! is synchronous and never touches the network or the filesystem. CSV
//! ingestion, cutover price loading, configuration and quote fetching sit
//! around it and feed it plain values.

pub mod capital_gain;
pub mod config;
pub mod error;
pub mod ingest;
pub mod market_price;
pub mod portfolio;
pub mod precision;
pub mod queue;
pub mod quotes;
pub mod reference_price;
pub mod stock;
pub mod summary;
pub mod symbol_alias;
pub mod transaction;
pub mod validation;

pub use ltcg_quotes;

pub use capital_gain::{CapitalGain, GainCalculator, Grandfathering, TermClass};
pub use config::{ConfigError, QuoteSettings, ReferenceSource, Settings};
pub use error::{InvalidInput, LedgerError, PriceError};
pub use ingest::{read_transactions, read_transactions_file, IngestError, RawTransaction};
pub use market_price::{MarketPrice, QuoteBook};
pub use portfolio::{HoldingFailure, Portfolio};
pub use quotes::{fetch_quote_book, with_retry};
pub use reference_price::{ReferencePrice, ReferencePriceError, ReferencePriceTable};
pub use stock::Stock;
pub use summary::{HoldingSummary, HoldingTotal, PortfolioSummary, RealizedSummary, RealizedTotal};
pub use symbol_alias::{load_symbol_aliases, SymbolAliasError, SymbolAliases};
pub use transaction::{Mode, Trade, TransactionRecord};
