//! Per-security and portfolio roll-ups of computed gains.
//!
//! Pure aggregation: nothing here recomputes a gain, it only sums the
//! figures each [`CapitalGain`] already carries and derives averages.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::capital_gain::CapitalGain;
use crate::portfolio::Portfolio;
use crate::precision::{percent, round3, round4};
use crate::stock::Stock;

#[derive(Debug, Clone, Default)]
struct Totals {
    shares: u64,
    buy_value: Decimal,
    sell_value: Decimal,
    gross_gain: Decimal,
    buy_charges: Decimal,
    sell_charges: Decimal,
    net_charges: Decimal,
    short_gain: Decimal,
    long_gain: Decimal,
    tax_long_gain: Decimal,
}

impl Totals {
    fn of(gains: &[CapitalGain]) -> Self {
        gains.iter().fold(Self::default(), |mut t, g| {
            t.shares += g.shares();
            t.buy_value += g.buy_value;
            t.sell_value += g.sell_value;
            t.gross_gain += g.gross_gain;
            t.buy_charges += g.buy_charges;
            t.sell_charges += g.sell_charges;
            t.net_charges += g.net_charges;
            t.short_gain += g.short_gain;
            t.long_gain += g.long_gain;
            t.tax_long_gain += g.tax_long_gain;
            t
        })
    }

    fn per_share(&self, amount: Decimal) -> Decimal {
        if self.shares == 0 {
            Decimal::ZERO
        } else {
            round3(amount / Decimal::from(self.shares))
        }
    }
}

/// One security's realized lots rolled into a line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealizedSummary {
    pub symbol: String,
    pub name: String,
    pub shares: u64,
    pub buy_value: Decimal,
    pub sell_value: Decimal,
    pub gross_gain: Decimal,
    pub buy_charges: Decimal,
    pub sell_charges: Decimal,
    pub net_charges: Decimal,
    pub short_gain: Decimal,
    pub long_gain: Decimal,
    pub tax_long_gain: Decimal,
    pub avg_buy_price: Decimal,
    pub avg_sell_price: Decimal,
    pub avg_unit_gain: Decimal,
    /// Short plus long net gain.
    pub net_realized: Decimal,
    pub percent: Decimal,
}

impl RealizedSummary {
    /// `None` when the security has no realized lots.
    pub fn from_stock(stock: &Stock) -> Option<Self> {
        let gains = stock.realized_gains();
        if gains.is_empty() {
            return None;
        }
        let t = Totals::of(gains);
        let avg_buy_price = t.per_share(t.buy_value);
        let avg_sell_price = t.per_share(t.sell_value);
        let net_realized = t.short_gain + t.long_gain;
        Some(Self {
            symbol: stock.symbol().to_string(),
            name: stock.name().to_string(),
            shares: t.shares,
            buy_value: t.buy_value,
            sell_value: t.sell_value,
            gross_gain: t.gross_gain,
            buy_charges: t.buy_charges,
            sell_charges: t.sell_charges,
            net_charges: t.net_charges,
            short_gain: t.short_gain,
            long_gain: t.long_gain,
            tax_long_gain: t.tax_long_gain,
            avg_buy_price,
            avg_sell_price,
            avg_unit_gain: round3(avg_sell_price - avg_buy_price),
            net_realized,
            percent: percent(net_realized, t.buy_value),
        })
    }
}

/// One security's open lots rolled into a line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingSummary {
    pub symbol: String,
    pub name: String,
    pub shares: u64,
    /// Cost of the open lots, without charges.
    pub holding_value: Decimal,
    pub market_value: Decimal,
    pub unrealized: Decimal,
    pub buy_charges: Decimal,
    pub avg_buy_price: Decimal,
    pub market_price: Decimal,
    /// Cost per share including buy charges.
    pub avg_cost: Decimal,
    pub unit_gain: Decimal,
    pub short_gain: Decimal,
    pub long_gain: Decimal,
    pub tax_long_gain: Decimal,
    pub net_unrealized: Decimal,
    pub percent: Decimal,
}

impl HoldingSummary {
    /// `None` when nothing is held or the holdings could not be valued.
    pub fn from_stock(stock: &Stock) -> Option<Self> {
        let gains = stock.holding_gains();
        if gains.is_empty() {
            return None;
        }
        let t = Totals::of(gains);
        let avg_cost = t.per_share(t.buy_value + t.buy_charges);
        let market_price = t.per_share(t.sell_value);
        let net_unrealized = t.short_gain + t.long_gain;
        Some(Self {
            symbol: stock.symbol().to_string(),
            name: stock.name().to_string(),
            shares: t.shares,
            holding_value: t.buy_value,
            market_value: t.sell_value,
            unrealized: t.gross_gain,
            buy_charges: t.buy_charges,
            avg_buy_price: t.per_share(t.buy_value),
            market_price,
            avg_cost,
            unit_gain: round4(market_price - avg_cost),
            short_gain: t.short_gain,
            long_gain: t.long_gain,
            tax_long_gain: t.tax_long_gain,
            net_unrealized,
            percent: percent(net_unrealized, t.buy_value),
        })
    }
}

/// Column sums of the realized table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RealizedTotal {
    pub buy_value: Decimal,
    pub sell_value: Decimal,
    pub gross_gain: Decimal,
    pub buy_charges: Decimal,
    pub sell_charges: Decimal,
    pub net_charges: Decimal,
    pub short_gain: Decimal,
    pub long_gain: Decimal,
    pub tax_long_gain: Decimal,
    pub net_realized: Decimal,
    pub percent: Decimal,
}

/// Column sums of the holding table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HoldingTotal {
    pub holding_value: Decimal,
    pub market_value: Decimal,
    pub unrealized: Decimal,
    pub buy_charges: Decimal,
    pub short_gain: Decimal,
    pub long_gain: Decimal,
    pub tax_long_gain: Decimal,
    pub net_unrealized: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub realized: Vec<RealizedSummary>,
    pub realized_total: Option<RealizedTotal>,
    pub holding: Vec<HoldingSummary>,
    pub holding_total: Option<HoldingTotal>,
    pub dividend_income: Decimal,
}

impl PortfolioSummary {
    pub fn from_portfolio(portfolio: &Portfolio) -> Self {
        let realized: Vec<_> = portfolio.stocks().filter_map(RealizedSummary::from_stock).collect();
        let holding: Vec<_> = portfolio.stocks().filter_map(HoldingSummary::from_stock).collect();
        let dividend_income = portfolio.stocks().map(Stock::dividend_income).sum();

        let realized_total = (!realized.is_empty()).then(|| {
            let mut t = realized.iter().fold(RealizedTotal::default(), |mut t, r| {
                t.buy_value += r.buy_value;
                t.sell_value += r.sell_value;
                t.gross_gain += r.gross_gain;
                t.buy_charges += r.buy_charges;
                t.sell_charges += r.sell_charges;
                t.net_charges += r.net_charges;
                t.short_gain += r.short_gain;
                t.long_gain += r.long_gain;
                t.tax_long_gain += r.tax_long_gain;
                t.net_realized += r.net_realized;
                t
            });
            t.percent = percent(t.net_realized, t.buy_value);
            t
        });

        let holding_total = (!holding.is_empty()).then(|| {
            let mut t = holding.iter().fold(HoldingTotal::default(), |mut t, h| {
                t.holding_value += h.holding_value;
                t.market_value += h.market_value;
                t.unrealized += h.unrealized;
                t.buy_charges += h.buy_charges;
                t.short_gain += h.short_gain;
                t.long_gain += h.long_gain;
                t.tax_long_gain += h.tax_long_gain;
                t.net_unrealized += h.net_unrealized;
                t
            });
            t.percent = percent(t.net_unrealized, t.holding_value);
            t
        });

        Self {
            realized,
            realized_total,
            holding,
            holding_total,
            dividend_income,
        }
    }
}
