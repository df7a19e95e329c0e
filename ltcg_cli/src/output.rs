use anyhow::Result;
use ltcg_lib::{
    CapitalGain, HoldingFailure, HoldingSummary, HoldingTotal, RealizedSummary, RealizedTotal,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "markdown" | "md" => Ok(Self::Markdown),
            other => anyhow::bail!(
                "unknown output format '{}'. Valid values: table, markdown, json, csv",
                other
            ),
        }
    }
}

#[derive(Tabled, Serialize)]
pub struct RealizedLotRow {
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Buy Date")]
    #[serde(rename = "Buy Date")]
    buy_date: String,
    #[tabled(rename = "Sell Date")]
    #[serde(rename = "Sell Date")]
    sell_date: String,
    #[tabled(rename = "Shares")]
    #[serde(rename = "Shares")]
    shares: u64,
    #[tabled(rename = "Buy Price")]
    #[serde(rename = "Buy Price")]
    buy_price: String,
    #[tabled(rename = "Sell Price")]
    #[serde(rename = "Sell Price")]
    sell_price: String,
    #[tabled(rename = "Jan31")]
    #[serde(rename = "Jan31")]
    reference_price: String,
    #[tabled(rename = "Buy Value")]
    #[serde(rename = "Buy Value")]
    buy_value: String,
    #[tabled(rename = "Sell Value")]
    #[serde(rename = "Sell Value")]
    sell_value: String,
    #[tabled(rename = "Gross")]
    #[serde(rename = "Gross")]
    gross_gain: String,
    #[tabled(rename = "Charges")]
    #[serde(rename = "Charges")]
    net_charges: String,
    #[tabled(rename = "Net")]
    #[serde(rename = "Net")]
    net_gain: String,
    #[tabled(rename = "Term")]
    #[serde(rename = "Term")]
    term: String,
    #[tabled(rename = "Taxable")]
    #[serde(rename = "Taxable")]
    tax_net_gain: String,
    #[tabled(rename = "Percent")]
    #[serde(rename = "Percent")]
    percent: String,
}

#[derive(Tabled, Serialize)]
pub struct HoldingLotRow {
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Buy Date")]
    #[serde(rename = "Buy Date")]
    buy_date: String,
    #[tabled(rename = "Shares")]
    #[serde(rename = "Shares")]
    shares: u64,
    #[tabled(rename = "Buy Price")]
    #[serde(rename = "Buy Price")]
    buy_price: String,
    #[tabled(rename = "Market Price")]
    #[serde(rename = "Market Price")]
    market_price: String,
    #[tabled(rename = "Jan31")]
    #[serde(rename = "Jan31")]
    reference_price: String,
    #[tabled(rename = "Holding Value")]
    #[serde(rename = "Holding Value")]
    holding_value: String,
    #[tabled(rename = "Market Value")]
    #[serde(rename = "Market Value")]
    market_value: String,
    #[tabled(rename = "Unrealized")]
    #[serde(rename = "Unrealized")]
    unrealized: String,
    #[tabled(rename = "Charges")]
    #[serde(rename = "Charges")]
    buy_charges: String,
    #[tabled(rename = "Net")]
    #[serde(rename = "Net")]
    net_gain: String,
    #[tabled(rename = "Term")]
    #[serde(rename = "Term")]
    term: String,
    #[tabled(rename = "Taxable")]
    #[serde(rename = "Taxable")]
    tax_net_gain: String,
    #[tabled(rename = "Percent")]
    #[serde(rename = "Percent")]
    percent: String,
}

#[derive(Tabled, Serialize)]
pub struct RealizedSummaryRow {
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Shares")]
    #[serde(rename = "Shares")]
    shares: String,
    #[tabled(rename = "Avg Buy")]
    #[serde(rename = "Avg Buy")]
    avg_buy_price: String,
    #[tabled(rename = "Avg Sell")]
    #[serde(rename = "Avg Sell")]
    avg_sell_price: String,
    #[tabled(rename = "Buy Value")]
    #[serde(rename = "Buy Value")]
    buy_value: String,
    #[tabled(rename = "Sell Value")]
    #[serde(rename = "Sell Value")]
    sell_value: String,
    #[tabled(rename = "Gross")]
    #[serde(rename = "Gross")]
    gross_gain: String,
    #[tabled(rename = "Buy Chg")]
    #[serde(rename = "Buy Chg")]
    buy_charges: String,
    #[tabled(rename = "Sell Chg")]
    #[serde(rename = "Sell Chg")]
    sell_charges: String,
    #[tabled(rename = "Net Chg")]
    #[serde(rename = "Net Chg")]
    net_charges: String,
    #[tabled(rename = "STCG")]
    #[serde(rename = "STCG")]
    short_gain: String,
    #[tabled(rename = "LTCG")]
    #[serde(rename = "LTCG")]
    long_gain: String,
    #[tabled(rename = "Taxable LTCG")]
    #[serde(rename = "Taxable LTCG")]
    tax_long_gain: String,
    #[tabled(rename = "Net Realized")]
    #[serde(rename = "Net Realized")]
    net_realized: String,
    #[tabled(rename = "Percent")]
    #[serde(rename = "Percent")]
    percent: String,
}

#[derive(Tabled, Serialize)]
pub struct HoldingSummaryRow {
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Shares")]
    #[serde(rename = "Shares")]
    shares: String,
    #[tabled(rename = "Avg Buy")]
    #[serde(rename = "Avg Buy")]
    avg_buy_price: String,
    #[tabled(rename = "Market Price")]
    #[serde(rename = "Market Price")]
    market_price: String,
    #[tabled(rename = "Avg Cost")]
    #[serde(rename = "Avg Cost")]
    avg_cost: String,
    #[tabled(rename = "Unit Gain")]
    #[serde(rename = "Unit Gain")]
    unit_gain: String,
    #[tabled(rename = "Holding Value")]
    #[serde(rename = "Holding Value")]
    holding_value: String,
    #[tabled(rename = "Market Value")]
    #[serde(rename = "Market Value")]
    market_value: String,
    #[tabled(rename = "Charges")]
    #[serde(rename = "Charges")]
    buy_charges: String,
    #[tabled(rename = "STUG")]
    #[serde(rename = "STUG")]
    short_gain: String,
    #[tabled(rename = "LTUG")]
    #[serde(rename = "LTUG")]
    long_gain: String,
    #[tabled(rename = "Taxable LTUG")]
    #[serde(rename = "Taxable LTUG")]
    tax_long_gain: String,
    #[tabled(rename = "Net Unrealized")]
    #[serde(rename = "Net Unrealized")]
    net_unrealized: String,
    #[tabled(rename = "Percent")]
    #[serde(rename = "Percent")]
    percent: String,
}

#[derive(Tabled, Serialize)]
pub struct FailureRow {
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Error")]
    #[serde(rename = "Error")]
    error: String,
}

#[derive(Tabled, Serialize)]
pub struct CheckRow {
    #[tabled(rename = "Securities")]
    #[serde(rename = "Securities")]
    pub securities: usize,
    #[tabled(rename = "Records")]
    #[serde(rename = "Records")]
    pub records: usize,
    #[tabled(rename = "Realized Lots")]
    #[serde(rename = "Realized Lots")]
    pub realized_lots: usize,
    #[tabled(rename = "Open Lots")]
    #[serde(rename = "Open Lots")]
    pub open_lots: usize,
}

// -- Formatting --

fn format_amount(value: Decimal) -> String {
    format!("{:.3}", value)
}

fn format_percent(value: Decimal) -> String {
    format!("{:.3}%", value)
}

/// Blank column for the TOTAL row of a summary table.
const NA: &str = "*--*";

// -- Row builders --

pub fn build_realized_lot_rows<'a>(
    gains: impl IntoIterator<Item = &'a CapitalGain>,
) -> Vec<RealizedLotRow> {
    gains
        .into_iter()
        .map(|g| RealizedLotRow {
            symbol: g.symbol().to_string(),
            buy_date: g.buy.date.to_string(),
            sell_date: g.sell.date.to_string(),
            shares: g.shares(),
            buy_price: format_amount(g.buy.price),
            sell_price: format_amount(g.sell.price),
            reference_price: g.reference_price.map(format_amount).unwrap_or_default(),
            buy_value: format_amount(g.buy_value),
            sell_value: format_amount(g.sell_value),
            gross_gain: format_amount(g.gross_gain),
            net_charges: format_amount(g.net_charges),
            net_gain: format_amount(g.net_gain),
            term: g.term.to_string(),
            tax_net_gain: format_amount(g.tax_net_gain),
            percent: format_percent(g.gain_percent),
        })
        .collect()
}

pub fn build_holding_lot_rows<'a>(
    gains: impl IntoIterator<Item = &'a CapitalGain>,
) -> Vec<HoldingLotRow> {
    gains
        .into_iter()
        .map(|g| HoldingLotRow {
            symbol: g.symbol().to_string(),
            buy_date: g.buy.date.to_string(),
            shares: g.shares(),
            buy_price: format_amount(g.buy.price),
            market_price: format_amount(g.sell.price),
            reference_price: g.reference_price.map(format_amount).unwrap_or_default(),
            holding_value: format_amount(g.buy_value),
            market_value: format_amount(g.sell_value),
            unrealized: format_amount(g.gross_gain),
            buy_charges: format_amount(g.buy_charges),
            net_gain: format_amount(g.net_gain),
            term: g.term.to_string(),
            tax_net_gain: format_amount(g.tax_net_gain),
            percent: format_percent(g.gain_percent),
        })
        .collect()
}

pub fn build_realized_summary_rows(
    rows: &[RealizedSummary],
    total: Option<&RealizedTotal>,
) -> Vec<RealizedSummaryRow> {
    let mut out: Vec<RealizedSummaryRow> = rows
        .iter()
        .map(|r| RealizedSummaryRow {
            name: r.name.clone(),
            shares: r.shares.to_string(),
            avg_buy_price: format_amount(r.avg_buy_price),
            avg_sell_price: format_amount(r.avg_sell_price),
            buy_value: format_amount(r.buy_value),
            sell_value: format_amount(r.sell_value),
            gross_gain: format_amount(r.gross_gain),
            buy_charges: format_amount(r.buy_charges),
            sell_charges: format_amount(r.sell_charges),
            net_charges: format_amount(r.net_charges),
            short_gain: format_amount(r.short_gain),
            long_gain: format_amount(r.long_gain),
            tax_long_gain: format_amount(r.tax_long_gain),
            net_realized: format_amount(r.net_realized),
            percent: format_percent(r.percent),
        })
        .collect();

    if let Some(t) = total {
        out.push(RealizedSummaryRow {
            name: "TOTAL".to_string(),
            shares: NA.to_string(),
            avg_buy_price: NA.to_string(),
            avg_sell_price: NA.to_string(),
            buy_value: format_amount(t.buy_value),
            sell_value: format_amount(t.sell_value),
            gross_gain: format_amount(t.gross_gain),
            buy_charges: format_amount(t.buy_charges),
            sell_charges: format_amount(t.sell_charges),
            net_charges: format_amount(t.net_charges),
            short_gain: format_amount(t.short_gain),
            long_gain: format_amount(t.long_gain),
            tax_long_gain: format_amount(t.tax_long_gain),
            net_realized: format_amount(t.net_realized),
            percent: format_percent(t.percent),
        });
    }
    out
}

pub fn build_holding_summary_rows(
    rows: &[HoldingSummary],
    total: Option<&HoldingTotal>,
) -> Vec<HoldingSummaryRow> {
    let mut out: Vec<HoldingSummaryRow> = rows
        .iter()
        .map(|h| HoldingSummaryRow {
            name: h.name.clone(),
            shares: h.shares.to_string(),
            avg_buy_price: format_amount(h.avg_buy_price),
            market_price: format_amount(h.market_price),
            avg_cost: format_amount(h.avg_cost),
            unit_gain: format_amount(h.unit_gain),
            holding_value: format_amount(h.holding_value),
            market_value: format_amount(h.market_value),
            buy_charges: format_amount(h.buy_charges),
            short_gain: format_amount(h.short_gain),
            long_gain: format_amount(h.long_gain),
            tax_long_gain: format_amount(h.tax_long_gain),
            net_unrealized: format_amount(h.net_unrealized),
            percent: format_percent(h.percent),
        })
        .collect();

    if let Some(t) = total {
        out.push(HoldingSummaryRow {
            name: "TOTAL".to_string(),
            shares: NA.to_string(),
            avg_buy_price: NA.to_string(),
            market_price: NA.to_string(),
            avg_cost: NA.to_string(),
            unit_gain: NA.to_string(),
            holding_value: format_amount(t.holding_value),
            market_value: format_amount(t.market_value),
            buy_charges: format_amount(t.buy_charges),
            short_gain: format_amount(t.short_gain),
            long_gain: format_amount(t.long_gain),
            tax_long_gain: format_amount(t.tax_long_gain),
            net_unrealized: format_amount(t.net_unrealized),
            percent: format_percent(t.percent),
        });
    }
    out
}

pub fn build_failure_rows(failures: &[HoldingFailure]) -> Vec<FailureRow> {
    failures
        .iter()
        .map(|f| {
            let error = match std::error::Error::source(&f.error) {
                Some(source) => format!("{}: {}", f.error, source),
                None => f.error.to_string(),
            };
            FailureRow {
                symbol: f.symbol.clone(),
                error,
            }
        })
        .collect()
}

// -- Rendering --

/// Print one titled table in a human-readable format. Empty tables are skipped.
pub fn print_section<R: Tabled>(title: &str, rows: Vec<R>, format: &OutputFormat) {
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new(rows);
    match format {
        OutputFormat::Markdown => {
            table.with(Style::markdown());
            println!("\n## {}\n", title);
        }
        _ => {
            println!("\n{}\n{}\n", title, "=".repeat(title.len() + 1));
        }
    }
    println!("{}", table);
}

/// Print rows as CSV with their own header line.
pub fn print_csv<R: Serialize>(rows: &[R]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}
