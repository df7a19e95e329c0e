//! The `report` subcommand: realized gains plus holdings valued as of a date.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use ltcg_lib::ltcg_quotes::Client;
use ltcg_lib::validation::{parse_amount, validate_date, validate_symbol};
use ltcg_lib::{
    fetch_quote_book, CapitalGain, GainCalculator, HoldingFailure, PortfolioSummary, QuoteBook,
    SymbolAliases,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::output::{
    build_failure_rows, build_holding_lot_rows, build_holding_summary_rows,
    build_realized_lot_rows, build_realized_summary_rows, print_csv, print_json, print_section,
    OutputFormat,
};

#[derive(Args)]
pub struct ReportArgs {
    /// Trade log CSV
    pub trades: PathBuf,

    /// Settings file (TOML). Falls back to $LTCG_CONFIG, then built-in defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Valuation date for holdings (default: today)
    #[arg(long)]
    pub as_of: Option<String>,

    /// Fixed market price, e.g. NSE:TCS=3500 (repeatable, skips fetching that symbol)
    #[arg(long = "price", value_name = "SYMBOL=PRICE")]
    pub prices: Vec<String>,

    /// Do not fetch quotes; holdings without a --price are reported as failures
    #[arg(long)]
    pub offline: bool,

    /// Also print every matched lot
    #[arg(long)]
    pub detail: bool,
}

#[derive(Serialize)]
struct FailureJson {
    symbol: String,
    error: String,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    as_of: NaiveDate,
    summary: &'a PortfolioSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    realized_lots: Option<Vec<&'a CapitalGain>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    holding_lots: Option<Vec<&'a CapitalGain>>,
    failures: Vec<FailureJson>,
}

fn parse_price_override(input: &str, aliases: &SymbolAliases) -> Result<(String, Decimal)> {
    let Some((symbol, price)) = input.split_once('=') else {
        bail!("invalid --price '{}': expected SYMBOL=PRICE", input);
    };
    let symbol = aliases.normalize(&validate_symbol(symbol)?);
    let price = parse_amount(price, "price")?;
    if price <= Decimal::ZERO {
        bail!("invalid --price '{}': price must be positive", input);
    }
    Ok((symbol, price))
}

fn parse_as_of(input: Option<&str>) -> Result<NaiveDate> {
    match input {
        Some(s) => Ok(validate_date(s)?),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub async fn run(args: &ReportArgs, format: &OutputFormat) -> Result<()> {
    let as_of = parse_as_of(args.as_of.as_deref())?;
    let mut loaded = super::load(&args.trades, args.config.as_deref())?;
    let calc = GainCalculator::new(loaded.settings.grandfathering, &loaded.references);
    loaded.portfolio.realize_all(&calc)?;

    let overrides = args
        .prices
        .iter()
        .map(|p| parse_price_override(p, &loaded.aliases))
        .collect::<Result<Vec<_>>>()?;

    let open = loaded.portfolio.open_symbols();
    let to_fetch: Vec<String> = open
        .iter()
        .filter(|s| !overrides.iter().any(|(o, _)| o == *s))
        .cloned()
        .collect();

    let book = if args.offline || to_fetch.is_empty() {
        QuoteBook::new()
    } else {
        let quotes = &loaded.settings.quotes;
        let client = Arc::new(Client::new().timeout(quotes.timeout()));

        let pb = ProgressBar::new(to_fetch.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
            )?,
        );
        pb.set_message("fetching quotes...");

        let mut fetched = 0usize;
        let mut failed = 0usize;
        let book = fetch_quote_book(client, &to_fetch, &loaded.aliases, quotes, |symbol, ok| {
            if ok {
                fetched += 1;
            } else {
                failed += 1;
                pb.println(format!("  {}: quote unavailable", symbol));
            }
            pb.set_message(format!("{} ok, {} err", fetched, failed));
            pb.inc(1);
        })
        .await;
        pb.finish_with_message(format!("Quotes: {} ok, {} err", fetched, failed));
        book
    };
    for (symbol, price) in overrides {
        book.insert(symbol, price);
    }

    let failures = loaded.portfolio.hold_all(&calc, &book, as_of)?;
    for failure in &failures {
        eprintln!("Warning: {}", failure.error);
    }

    let summary = PortfolioSummary::from_portfolio(&loaded.portfolio);
    let realized_lots: Vec<&CapitalGain> = loaded
        .portfolio
        .stocks()
        .flat_map(|s| s.realized_gains())
        .collect();
    let holding_lots: Vec<&CapitalGain> = loaded
        .portfolio
        .stocks()
        .flat_map(|s| s.holding_gains())
        .collect();

    match format {
        OutputFormat::Json => {
            let report = ReportJson {
                as_of,
                summary: &summary,
                realized_lots: args.detail.then_some(realized_lots),
                holding_lots: args.detail.then_some(holding_lots),
                failures: failure_json(&failures),
            };
            print_json(&report);
        }
        OutputFormat::Csv => {
            if args.detail {
                print_csv(&build_realized_lot_rows(realized_lots))?;
                println!();
                print_csv(&build_holding_lot_rows(holding_lots))?;
            } else {
                print_csv(&build_realized_summary_rows(
                    &summary.realized,
                    summary.realized_total.as_ref(),
                ))?;
                println!();
                print_csv(&build_holding_summary_rows(
                    &summary.holding,
                    summary.holding_total.as_ref(),
                ))?;
            }
        }
        OutputFormat::Table | OutputFormat::Markdown => {
            if args.detail {
                print_section("Realized lots", build_realized_lot_rows(realized_lots), format);
                print_section("Holding lots", build_holding_lot_rows(holding_lots), format);
            }
            print_section(
                "Realized capital gains",
                build_realized_summary_rows(&summary.realized, summary.realized_total.as_ref()),
                format,
            );
            print_section(
                &format!("Holdings as of {}", as_of),
                build_holding_summary_rows(&summary.holding, summary.holding_total.as_ref()),
                format,
            );
            print_section("Unvalued holdings", build_failure_rows(&failures), format);
            if summary.dividend_income > Decimal::ZERO {
                println!("\nDividend income: {:.3}", summary.dividend_income);
            }
        }
    }

    Ok(())
}

fn failure_json(failures: &[HoldingFailure]) -> Vec<FailureJson> {
    failures
        .iter()
        .map(|f| FailureJson {
            symbol: f.symbol.clone(),
            error: f.error.to_string(),
        })
        .collect()
}
