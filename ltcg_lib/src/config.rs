//! Run settings loaded from a TOML file.
//!
//! Every section is optional and falls back to the statutory rule and the
//! built-in quote fetching limits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ltcg_quotes::Exchange;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capital_gain::Grandfathering;
use crate::reference_price::{ReferencePriceError, ReferencePriceTable};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Failed to load reference prices from {path}: {source}")]
    ReferencePrices {
        path: String,
        #[source]
        source: ReferencePriceError,
    },
}

/// Limits for fetching live quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteSettings {
    /// Maximum concurrent quote requests.
    pub concurrency: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_retries: 5,
            base_backoff_ms: 2000,
            timeout_secs: 30,
        }
    }
}

impl QuoteSettings {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One end-of-day price file for the cutover date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSource {
    pub exchange: Exchange,
    pub path: PathBuf,
    #[serde(default)]
    pub symbol_column: usize,
    #[serde(default = "default_price_column")]
    pub price_column: usize,
    /// Skip the file with a warning when it does not exist.
    #[serde(default)]
    pub optional: bool,
}

impl ReferenceSource {
    /// The bhavcopy files looked up when no config names any: symbol in
    /// column 0 and close price in column 8, both optional.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                exchange: Exchange::Nse,
                path: PathBuf::from("lib/NSE_20180131.csv"),
                symbol_column: 0,
                price_column: default_price_column(),
                optional: true,
            },
            Self {
                exchange: Exchange::Bse,
                path: PathBuf::from("lib/BSE_20180131.csv"),
                symbol_column: 0,
                price_column: default_price_column(),
                optional: true,
            },
        ]
    }
}

fn default_price_column() -> usize {
    8
}

/// Upper bound for `quotes.base_backoff_ms`.
pub const MAX_BASE_BACKOFF_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grandfathering: Grandfathering,
    pub reference_prices: Vec<ReferenceSource>,
    pub quotes: QuoteSettings,
    /// Directory relative reference paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grandfathering: Grandfathering::default(),
            reference_prices: ReferenceSource::defaults(),
            quotes: QuoteSettings::default(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quotes.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "quotes.concurrency must be at least 1".to_string(),
            ));
        }
        if self.quotes.timeout_secs == 0 || self.quotes.timeout_secs > 300 {
            return Err(ConfigError::Invalid(
                "quotes.timeout_secs must be between 1-300 seconds".to_string(),
            ));
        }
        if self.quotes.base_backoff_ms > MAX_BASE_BACKOFF_MS {
            return Err(ConfigError::Invalid(format!(
                "quotes.base_backoff_ms must be at most {}",
                MAX_BASE_BACKOFF_MS
            )));
        }
        if self.grandfathering.long_term_days < 0 {
            return Err(ConfigError::Invalid(
                "grandfathering.long_term_days must not be negative".to_string(),
            ));
        }
        if self.grandfathering.effective_date < self.grandfathering.cutover_date {
            return Err(ConfigError::Invalid(
                "grandfathering.effective_date must not precede cutover_date".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load every configured cutover price file into one table.
    pub fn load_reference_prices(&self) -> Result<ReferencePriceTable, ConfigError> {
        let mut table = ReferencePriceTable::new();
        for source in &self.reference_prices {
            let path = self.resolve(&source.path);
            if source.optional && !path.exists() {
                tracing::warn!(
                    "Reference price file {} not found, skipping",
                    path.display()
                );
                continue;
            }
            table
                .load_file(&path, source.exchange, source.symbol_column, source.price_column)
                .map_err(|e| ConfigError::ReferencePrices {
                    path: path.display().to_string(),
                    source: e,
                })?;
        }
        tracing::info!(
            "Loaded {} reference price(s) from {} file(s)",
            table.len(),
            self.reference_prices.len()
        );
        Ok(table)
    }
}
