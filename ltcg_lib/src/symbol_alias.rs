//! Symbol alias resolution.
//!
//! Two tables, both loaded from `seed_data/symbol_aliases.yml` at compile
//! time:
//! - exchange prefixes (`BOM` -> `BSE`), applied to every symbol at ingest
//! - renamed securities (`NSE:LTI` -> `NSE:LTIM`), applied only when asking
//!   an exchange for a live quote, because the trade log and the cutover
//!   price files both use the code that was current at the time.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Error types for symbol alias operations.
#[derive(Error, Debug)]
pub enum SymbolAliasError {
    #[error("Failed to parse symbol alias YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("Duplicate 'from' entry in alias file: {0}")]
    DuplicateFrom(String),
}

/// Top-level structure for the symbol alias YAML file.
#[derive(Deserialize, Debug, Default)]
pub struct SymbolAliasFile {
    #[serde(default)]
    pub exchanges: Vec<Alias>,
    #[serde(default)]
    pub quotes: Vec<Alias>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Alias {
    pub from: String,
    pub to: String,
}

/// Resolved alias tables.
#[derive(Debug, Clone, Default)]
pub struct SymbolAliases {
    exchanges: HashMap<String, String>,
    quotes: HashMap<String, String>,
}

fn build_map(aliases: Vec<Alias>) -> Result<HashMap<String, String>, SymbolAliasError> {
    let mut map = HashMap::new();
    for alias in aliases {
        let from = alias.from.trim().to_uppercase();
        if map.contains_key(&from) {
            return Err(SymbolAliasError::DuplicateFrom(alias.from));
        }
        map.insert(from, alias.to.trim().to_uppercase());
    }
    Ok(map)
}

impl SymbolAliases {
    /// Rewrite a legacy exchange prefix. Symbols without a known prefix are
    /// returned unchanged.
    pub fn normalize(&self, symbol: &str) -> String {
        match symbol.split_once(':') {
            Some((exchange, code)) => match self.exchanges.get(exchange) {
                Some(to) => format!("{}:{}", to, code),
                None => symbol.to_string(),
            },
            None => symbol.to_string(),
        }
    }

    /// Symbol to request a live quote for.
    pub fn quote_symbol(&self, symbol: &str) -> String {
        let normalized = self.normalize(symbol);
        match self.quotes.get(&normalized) {
            Some(renamed) => renamed.clone(),
            None => normalized,
        }
    }
}

/// Parse symbol aliases from YAML content.
pub fn parse_symbol_aliases(yaml_content: &str) -> Result<SymbolAliases, SymbolAliasError> {
    let file: SymbolAliasFile = serde_yml::from_str(yaml_content)?;
    Ok(SymbolAliases {
        exchanges: build_map(file.exchanges)?,
        quotes: build_map(file.quotes)?,
    })
}

/// Load symbol aliases from the embedded YAML file.
pub fn load_symbol_aliases() -> Result<SymbolAliases, SymbolAliasError> {
    let yaml_content = include_str!("../../seed_data/symbol_aliases.yml");
    parse_symbol_aliases(yaml_content)
}
