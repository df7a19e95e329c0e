//! The `check` subcommand: validate and realize a trade log offline.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ltcg_lib::{GainCalculator, Portfolio};

use crate::output::{print_csv, print_json, print_section, CheckRow, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Trade log CSV
    pub trades: PathBuf,

    /// Settings file (TOML). Falls back to $LTCG_CONFIG, then built-in defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn check_row(portfolio: &Portfolio, records: usize) -> CheckRow {
    CheckRow {
        securities: portfolio.len(),
        records,
        realized_lots: portfolio.stocks().map(|s| s.realized_gains().len()).sum(),
        open_lots: portfolio
            .stocks()
            .map(|s| s.delivery_buys().iter().filter(|r| r.shares > 0).count())
            .sum(),
    }
}

pub fn run(args: &CheckArgs, format: &OutputFormat) -> Result<()> {
    let mut loaded = super::load(&args.trades, args.config.as_deref())?;
    let calc = GainCalculator::new(loaded.settings.grandfathering, &loaded.references);
    loaded.portfolio.realize_all(&calc)?;

    let row = check_row(&loaded.portfolio, loaded.records);
    match format {
        OutputFormat::Json => print_json(&row),
        OutputFormat::Csv => print_csv(&[row])?,
        OutputFormat::Table | OutputFormat::Markdown => {
            print_section("Trade log OK", vec![row], format)
        }
    }
    Ok(())
}
