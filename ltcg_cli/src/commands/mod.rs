//! CLI subcommand implementations.

pub mod check;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ltcg_lib::{
    load_symbol_aliases, read_transactions_file, Portfolio, ReferencePriceTable, Settings,
    SymbolAliases,
};

/// Environment variable naming the settings file when `--config` is absent.
pub const CONFIG_ENV: &str = "LTCG_CONFIG";

/// Everything a subcommand needs after reading the log and the settings.
pub struct Loaded {
    pub settings: Settings,
    pub aliases: SymbolAliases,
    pub references: ReferencePriceTable,
    pub portfolio: Portfolio,
    pub records: usize,
}

pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let path = match config {
        Some(p) => Some(p.to_path_buf()),
        None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
    };
    match path {
        Some(p) => Settings::from_file(&p)
            .with_context(|| format!("failed to load settings from {}", p.display())),
        None => Ok(Settings::default()),
    }
}

/// Read settings, cutover prices and the trade log into an unrealized portfolio.
pub fn load(trades: &Path, config: Option<&Path>) -> Result<Loaded> {
    let settings = load_settings(config)?;
    let references = settings.load_reference_prices()?;
    let aliases = load_symbol_aliases()?;

    let records = read_transactions_file(trades, &aliases)?;
    let count = records.len();
    let mut portfolio = Portfolio::new();
    for record in records {
        portfolio.process_transaction(record)?;
    }
    eprintln!(
        "Read {} record(s) for {} securities ({} cutover prices)",
        count,
        portfolio.len(),
        references.len()
    );

    Ok(Loaded {
        settings,
        aliases,
        references,
        portfolio,
        records: count,
    })
}
