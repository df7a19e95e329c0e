//! Gain computation for one matched (sell, buy) pair.
//!
//! [`GainCalculator::calculate`] is a pure function of its two records, the
//! [`Grandfathering`] rule and the cutover price table. Realized lots and
//! synthetic as-of-today sells for open lots both go through it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::precision::{percent, round3, round4};
use crate::reference_price::ReferencePrice;
use crate::transaction::TransactionRecord;

/// Holding-period class of a gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermClass {
    Short,
    Long,
}

impl TermClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermClass::Short => "Short",
            TermClass::Long => "Long",
        }
    }
}

impl std::fmt::Display for TermClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The long-term threshold and the cost-basis grandfathering window.
///
/// Lots bought on or before `cutover_date` and sold long-term on or after
/// `effective_date` may use the cutover closing price as their tax cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grandfathering {
    pub cutover_date: NaiveDate,
    pub effective_date: NaiveDate,
    /// Holdings strictly longer than this many days are long-term.
    pub long_term_days: i64,
}

impl Default for Grandfathering {
    fn default() -> Self {
        Self {
            cutover_date: NaiveDate::from_ymd_opt(2018, 1, 31).expect("valid date"),
            effective_date: NaiveDate::from_ymd_opt(2018, 4, 1).expect("valid date"),
            long_term_days: 365,
        }
    }
}

impl Grandfathering {
    pub fn classify_term(&self, buy_date: NaiveDate, sell_date: NaiveDate) -> TermClass {
        if (sell_date - buy_date).num_days() > self.long_term_days {
            TermClass::Long
        } else {
            TermClass::Short
        }
    }

    /// Whether a pair falls inside the grandfathering window.
    pub fn applies(&self, term: TermClass, buy_date: NaiveDate, sell_date: NaiveDate) -> bool {
        term == TermClass::Long && sell_date >= self.effective_date && buy_date <= self.cutover_date
    }
}

/// Cost per share used for tax when the cutover price `reference` is known.
///
/// The cutover price only ever raises the cost basis, and never above the
/// actual sell price, so grandfathering can shrink a gain but cannot turn a
/// gain into a loss or deepen a loss.
pub fn tax_buy_price(buy_price: Decimal, sell_price: Decimal, reference: Decimal) -> Decimal {
    if reference > buy_price {
        if sell_price >= reference {
            reference
        } else if sell_price >= buy_price {
            sell_price
        } else {
            buy_price
        }
    } else {
        buy_price
    }
}

/// A matched pair and every figure derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalGain {
    pub sell: TransactionRecord,
    pub buy: TransactionRecord,
    pub buy_value: Decimal,
    pub sell_value: Decimal,
    pub unit_gain: Decimal,
    pub gross_gain: Decimal,
    pub buy_charges: Decimal,
    pub sell_charges: Decimal,
    pub net_charges: Decimal,
    pub net_gain: Decimal,
    pub gain_percent: Decimal,
    pub term: TermClass,
    /// Cutover price consulted for this pair, if grandfathering applied.
    pub reference_price: Option<Decimal>,
    pub tax_buy_price: Decimal,
    pub tax_unit_gain: Decimal,
    pub tax_gross_gain: Decimal,
    pub tax_net_gain: Decimal,
    pub short_gain: Decimal,
    pub long_gain: Decimal,
    pub tax_long_gain: Decimal,
}

impl CapitalGain {
    pub fn symbol(&self) -> &str {
        &self.sell.symbol
    }

    pub fn shares(&self) -> u64 {
        self.sell.shares
    }
}

/// Builds [`CapitalGain`]s under one grandfathering rule and cutover table.
pub struct GainCalculator<'a> {
    rule: Grandfathering,
    references: &'a dyn ReferencePrice,
}

impl<'a> GainCalculator<'a> {
    pub fn new(rule: Grandfathering, references: &'a dyn ReferencePrice) -> Self {
        Self { rule, references }
    }

    pub fn rule(&self) -> &Grandfathering {
        &self.rule
    }

    pub fn calculate(
        &self,
        sell: &TransactionRecord,
        buy: &TransactionRecord,
    ) -> Result<CapitalGain, LedgerError> {
        if sell.shares != buy.shares {
            return Err(LedgerError::ShareMismatch {
                symbol: sell.symbol.clone(),
                sell_shares: sell.shares,
                buy_shares: buy.shares,
            });
        }
        if sell.date < buy.date {
            return Err(LedgerError::SellBeforeBuy {
                symbol: sell.symbol.clone(),
                buy_date: buy.date,
                sell_date: sell.date,
            });
        }

        let shares = Decimal::from(sell.shares);

        let buy_value = round3(shares * buy.price);
        let sell_value = round3(shares * sell.price);
        let unit_gain = round4(sell.price - buy.price);
        let gross_gain = round3(shares * unit_gain);
        let buy_charges = round3(buy.total_charges());
        let sell_charges = round3(sell.total_charges());
        let net_charges = buy_charges + sell_charges;
        let net_gain = gross_gain - net_charges;
        let gain_percent = percent(net_gain, buy_value);

        let term = self.rule.classify_term(buy.date, sell.date);

        let (tax_buy, reference_price) = if self.rule.applies(term, buy.date, sell.date) {
            let reference = self
                .references
                .reference_price(&buy.symbol)
                .ok_or_else(|| LedgerError::MissingReferencePrice(buy.symbol.clone()))?;
            (tax_buy_price(buy.price, sell.price, reference), Some(reference))
        } else {
            (buy.price, None)
        };

        let tax_unit_gain = round4(sell.price - tax_buy);
        let tax_gross_gain = round3(shares * tax_unit_gain);
        let tax_net_gain = tax_gross_gain - net_charges;

        let (short_gain, long_gain, tax_long_gain) = match term {
            TermClass::Short => (net_gain, Decimal::ZERO, Decimal::ZERO),
            TermClass::Long => (Decimal::ZERO, net_gain, tax_net_gain),
        };

        Ok(CapitalGain {
            sell: sell.clone(),
            buy: buy.clone(),
            buy_value,
            sell_value,
            unit_gain,
            gross_gain,
            buy_charges,
            sell_charges,
            net_charges,
            net_gain,
            gain_percent,
            term,
            reference_price,
            tax_buy_price: tax_buy,
            tax_unit_gain,
            tax_gross_gain,
            tax_net_gain,
            short_gain,
            long_gain,
            tax_long_gain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Mode, Trade};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(
        trade: Trade,
        on: NaiveDate,
        shares: u64,
        price: Decimal,
        charges: Decimal,
    ) -> TransactionRecord {
        let value = round3(Decimal::from(shares) * price);
        TransactionRecord {
            symbol: "NSE:INFY".into(),
            name: "Infosys".into(),
            trade,
            mode: Mode::Delivery,
            date: on,
            shares,
            price,
            value,
            brokerage: charges,
            stt: dec!(0),
            charges: dec!(0),
            receivable: value - charges,
        }
    }

    fn refs(price: Decimal) -> HashMap<String, Decimal> {
        let mut m = HashMap::new();
        m.insert("NSE:INFY".to_string(), price);
        m
    }

    #[test]
    fn term_boundary_is_strictly_more_than_365_days() {
        let rule = Grandfathering::default();
        let buy = date(2020, 3, 1);
        assert_eq!(
            rule.classify_term(buy, buy + chrono::Duration::days(365)),
            TermClass::Short
        );
        assert_eq!(
            rule.classify_term(buy, buy + chrono::Duration::days(366)),
            TermClass::Long
        );
        assert_eq!(rule.classify_term(buy, buy), TermClass::Short);
    }

    #[test]
    fn grandfathered_price_branches() {
        // buy 100, cutover 150
        assert_eq!(tax_buy_price(dec!(100), dec!(200), dec!(150)), dec!(150));
        assert_eq!(tax_buy_price(dec!(100), dec!(120), dec!(150)), dec!(120));
        assert_eq!(tax_buy_price(dec!(100), dec!(90), dec!(150)), dec!(100));
        // cutover below cost never helps
        assert_eq!(tax_buy_price(dec!(100), dec!(200), dec!(80)), dec!(100));
        assert_eq!(tax_buy_price(dec!(100), dec!(200), dec!(100)), dec!(100));
    }

    #[test]
    fn grandfathering_through_the_calculator() {
        let table = refs(dec!(150));
        let calc = GainCalculator::new(Grandfathering::default(), &table);
        let buy = record(Trade::Buy, date(2018, 1, 1), 1, dec!(100), dec!(0));

        for (sell_price, expected) in [(dec!(200), dec!(150)), (dec!(120), dec!(120)), (dec!(90), dec!(100))] {
            let sell = record(Trade::Sell, date(2019, 6, 1), 1, sell_price, dec!(0));
            let gain = calc.calculate(&sell, &buy).unwrap();
            assert_eq!(gain.term, TermClass::Long);
            assert_eq!(gain.tax_buy_price, expected, "sell at {}", sell_price);
            assert_eq!(gain.reference_price, Some(dec!(150)));
        }
    }

    #[test]
    fn end_to_end_long_term_pair() {
        let table = refs(dec!(120));
        let calc = GainCalculator::new(Grandfathering::default(), &table);
        let buy = record(Trade::Buy, date(2018, 1, 1), 10, dec!(100), dec!(5));
        let sell = record(Trade::Sell, date(2019, 6, 1), 10, dec!(150), dec!(5));

        let gain = calc.calculate(&sell, &buy).unwrap();
        assert_eq!(gain.buy_value, dec!(1000));
        assert_eq!(gain.sell_value, dec!(1500));
        assert_eq!(gain.unit_gain, dec!(50));
        assert_eq!(gain.gross_gain, dec!(500));
        assert_eq!(gain.net_charges, dec!(10));
        assert_eq!(gain.net_gain, dec!(490));
        assert_eq!(gain.gain_percent, dec!(49));
        assert_eq!(gain.term, TermClass::Long);
        assert_eq!(gain.tax_buy_price, dec!(120));
        assert_eq!(gain.tax_gross_gain, dec!(300));
        assert_eq!(gain.tax_net_gain, dec!(290));
        assert_eq!(gain.short_gain, dec!(0));
        assert_eq!(gain.long_gain, dec!(490));
        assert_eq!(gain.tax_long_gain, dec!(290));
    }

    #[test]
    fn short_term_ignores_reference_table() {
        let table: HashMap<String, Decimal> = HashMap::new();
        let calc = GainCalculator::new(Grandfathering::default(), &table);
        let buy = record(Trade::Buy, date(2018, 1, 1), 10, dec!(100), dec!(1));
        let sell = record(Trade::Sell, date(2018, 6, 1), 10, dec!(90), dec!(1));

        let gain = calc.calculate(&sell, &buy).unwrap();
        assert_eq!(gain.term, TermClass::Short);
        assert_eq!(gain.reference_price, None);
        assert_eq!(gain.tax_buy_price, dec!(100));
        assert_eq!(gain.net_gain, dec!(-102));
        assert_eq!(gain.short_gain, dec!(-102));
        assert_eq!(gain.long_gain, dec!(0));
        assert_eq!(gain.tax_long_gain, dec!(0));
    }

    #[test]
    fn long_term_bought_after_cutover_uses_cost() {
        let table: HashMap<String, Decimal> = HashMap::new();
        let calc = GainCalculator::new(Grandfathering::default(), &table);
        let buy = record(Trade::Buy, date(2018, 2, 1), 10, dec!(100), dec!(0));
        let sell = record(Trade::Sell, date(2019, 6, 1), 10, dec!(150), dec!(0));

        let gain = calc.calculate(&sell, &buy).unwrap();
        assert_eq!(gain.term, TermClass::Long);
        assert_eq!(gain.tax_buy_price, dec!(100));
        assert_eq!(gain.tax_long_gain, gain.long_gain);
    }

    #[test]
    fn missing_reference_price_is_fatal() {
        let table: HashMap<String, Decimal> = HashMap::new();
        let calc = GainCalculator::new(Grandfathering::default(), &table);
        let buy = record(Trade::Buy, date(2017, 6, 1), 10, dec!(100), dec!(0));
        let sell = record(Trade::Sell, date(2019, 6, 1), 10, dec!(150), dec!(0));

        assert_eq!(
            calc.calculate(&sell, &buy),
            Err(LedgerError::MissingReferencePrice("NSE:INFY".into()))
        );
    }

    #[test]
    fn rejects_mismatched_shares_and_reversed_dates() {
        let table: HashMap<String, Decimal> = HashMap::new();
        let calc = GainCalculator::new(Grandfathering::default(), &table);
        let buy = record(Trade::Buy, date(2019, 1, 1), 10, dec!(100), dec!(0));

        let sell = record(Trade::Sell, date(2019, 6, 1), 9, dec!(150), dec!(0));
        assert!(matches!(
            calc.calculate(&sell, &buy),
            Err(LedgerError::ShareMismatch { sell_shares: 9, buy_shares: 10, .. })
        ));

        let sell = record(Trade::Sell, date(2018, 12, 31), 10, dec!(150), dec!(0));
        assert!(matches!(
            calc.calculate(&sell, &buy),
            Err(LedgerError::SellBeforeBuy { .. })
        ));
    }

    #[test]
    fn calculation_is_idempotent() {
        let table = refs(dec!(120));
        let calc = GainCalculator::new(Grandfathering::default(), &table);
        let buy = record(Trade::Buy, date(2017, 3, 3), 7, dec!(101.333), dec!(2.5));
        let sell = record(Trade::Sell, date(2020, 2, 2), 7, dec!(133.777), dec!(3.25));

        let first = calc.calculate(&sell, &buy).unwrap();
        let second = calc.calculate(&sell, &buy).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_rule_moves_the_threshold() {
        let table: HashMap<String, Decimal> = HashMap::new();
        let rule = Grandfathering {
            long_term_days: 30,
            ..Grandfathering::default()
        };
        let calc = GainCalculator::new(rule, &table);
        let buy = record(Trade::Buy, date(2020, 1, 1), 1, dec!(10), dec!(0));
        let sell = record(Trade::Sell, date(2020, 3, 1), 1, dec!(11), dec!(0));
        assert_eq!(calc.calculate(&sell, &buy).unwrap().term, TermClass::Long);
    }
}
