//! Per-security ledger and FIFO lot matching.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::capital_gain::{CapitalGain, GainCalculator};
use crate::error::LedgerError;
use crate::market_price::MarketPrice;
use crate::queue::TransactionQueue;
use crate::transaction::{Mode, Trade, TransactionRecord};

/// Every record seen for one symbol, and the gains matched out of them.
///
/// Buys wait in one of two queues depending on how they settle. Sells are
/// matched against the queue named by their own mode, so an intraday sell
/// never consumes a delivery lot.
#[derive(Debug, Clone)]
pub struct Stock {
    symbol: String,
    name: String,
    delivery_buys: TransactionQueue,
    square_off_buys: TransactionQueue,
    sells: TransactionQueue,
    dividends: TransactionQueue,
    realized_gains: Vec<CapitalGain>,
    holding_gains: Vec<CapitalGain>,
}

impl Stock {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            delivery_buys: TransactionQueue::new(),
            square_off_buys: TransactionQueue::new(),
            sells: TransactionQueue::new(),
            dividends: TransactionQueue::new(),
            realized_gains: Vec::new(),
            holding_gains: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn realized_gains(&self) -> &[CapitalGain] {
        &self.realized_gains
    }

    pub fn holding_gains(&self) -> &[CapitalGain] {
        &self.holding_gains
    }

    pub fn delivery_buys(&self) -> &TransactionQueue {
        &self.delivery_buys
    }

    pub fn square_off_buys(&self) -> &TransactionQueue {
        &self.square_off_buys
    }

    pub fn sells(&self) -> &TransactionQueue {
        &self.sells
    }

    pub fn dividends(&self) -> &TransactionQueue {
        &self.dividends
    }

    /// Whether delivery lots are still waiting to be valued.
    pub fn has_open_delivery(&self) -> bool {
        self.delivery_buys.iter().any(|r| r.shares > 0)
    }

    /// Total dividend amount received.
    pub fn dividend_income(&self) -> Decimal {
        self.dividends.iter().map(|r| r.value).sum()
    }

    /// Route a record to the queue it belongs to. Cash movements are dropped.
    pub fn put_transaction_to_queue(&mut self, record: TransactionRecord) -> Result<(), LedgerError> {
        match (record.trade, record.mode) {
            (Trade::Dividend, _) => self.dividends.push_back(record),
            (Trade::CashIn | Trade::CashOut, _) => {}
            (Trade::Buy | Trade::Sell, Mode::Cash) => {
                return Err(LedgerError::InvalidMode {
                    symbol: record.symbol,
                    trade: record.trade,
                    mode: record.mode,
                })
            }
            (Trade::Buy, Mode::SquareOff) => self.square_off_buys.push_back(record),
            (Trade::Buy, Mode::Delivery) => self.delivery_buys.push_back(record),
            (Trade::Sell, Mode::SquareOff | Mode::Delivery) => self.sells.push_back(record),
        }
        Ok(())
    }

    /// Match every queued sell against earlier buys, oldest first.
    ///
    /// On success the sell and square-off queues are empty and only
    /// delivery lots may remain.
    pub fn realize_whole(&mut self, calc: &GainCalculator<'_>) -> Result<(), LedgerError> {
        while !self.sells.is_empty() {
            let sell = self.sells.pop_front()?;
            if is_spent(&sell)? {
                tracing::debug!("{}: dropping exhausted sell dated {}", self.symbol, sell.date);
                continue;
            }

            let buys = match sell.mode {
                Mode::SquareOff => &mut self.square_off_buys,
                Mode::Delivery => &mut self.delivery_buys,
                Mode::Cash => {
                    return Err(LedgerError::InvalidMode {
                        symbol: sell.symbol,
                        trade: sell.trade,
                        mode: sell.mode,
                    })
                }
            };

            let buy = loop {
                if buys.is_empty() {
                    return Err(LedgerError::UnmatchedSell {
                        symbol: sell.symbol,
                        date: sell.date,
                        shares: sell.shares,
                    });
                }
                let buy = buys.pop_front()?;
                if !is_spent(&buy)? {
                    break buy;
                }
            };

            let gain = if sell.shares >= buy.shares {
                let matched = sell.scale_down(buy.shares)?;
                let rest = sell.scale_down(sell.shares - buy.shares)?;
                tracing::debug!(
                    "{}: sell {} matched {} shares from buy {}, {} left",
                    self.symbol,
                    sell.date,
                    buy.shares,
                    buy.date,
                    rest.shares
                );
                self.sells.push_front(rest);
                calc.calculate(&matched, &buy)?
            } else {
                let matched = buy.scale_down(sell.shares)?;
                let rest = buy.scale_down(buy.shares - sell.shares)?;
                tracing::debug!(
                    "{}: buy {} split, {} shares to sell {}, {} left",
                    self.symbol,
                    buy.date,
                    sell.shares,
                    sell.date,
                    rest.shares
                );
                buys.push_front(rest);
                calc.calculate(&sell, &matched)?
            };
            self.realized_gains.push(gain);
        }

        if !self.square_off_buys.is_empty() {
            return Err(LedgerError::ResidualSquareOff {
                symbol: self.symbol.clone(),
                lots: self.square_off_buys.len(),
                shares: self.square_off_buys.total_shares(),
            });
        }

        tracing::info!(
            "{}: {} realized lot(s), {} open delivery lot(s)",
            self.symbol,
            self.realized_gains.len(),
            self.delivery_buys.len()
        );
        Ok(())
    }

    /// Value every remaining delivery lot as if sold at the current market
    /// price on `today`.
    ///
    /// The price is looked up once. If it or any lot fails, the queue is
    /// left as it was.
    pub fn holding_whole(
        &mut self,
        calc: &GainCalculator<'_>,
        market: &dyn MarketPrice,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        if self.delivery_buys.is_empty() {
            return Ok(());
        }

        let mut open = Vec::with_capacity(self.delivery_buys.len());
        for buy in &self.delivery_buys {
            if !is_spent(buy)? {
                open.push(buy);
            }
        }

        if !open.is_empty() {
            let price = market
                .current_price(&self.symbol)
                .map_err(|source| LedgerError::MarketPrice {
                    symbol: self.symbol.clone(),
                    source,
                })?;

            let gains = open
                .into_iter()
                .map(|buy| calc.calculate(&buy.as_of_today_sell_equivalent(today, price), buy))
                .collect::<Result<Vec<_>, _>>()?;

            tracing::info!(
                "{}: {} holding lot(s) valued at {}",
                self.symbol,
                gains.len(),
                price
            );
            self.holding_gains.extend(gains);
        }

        self.delivery_buys.clear();
        Ok(())
    }
}

/// A zero-share record is harmless only if nothing else is left on it.
fn is_spent(record: &TransactionRecord) -> Result<bool, LedgerError> {
    if record.shares > 0 {
        return Ok(false);
    }
    if record.has_monetary_residue() {
        return Err(LedgerError::ZeroShareResidue {
            symbol: record.symbol.clone(),
            date: record.date,
            value: record.value,
        });
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capital_gain::{Grandfathering, TermClass};
    use crate::error::PriceError;
    use crate::market_price::QuoteBook;
    use crate::precision::round3;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    const SYMBOL: &str = "NSE:INFY";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(
        trade: Trade,
        mode: Mode,
        on: NaiveDate,
        shares: u64,
        price: Decimal,
        charges: Decimal,
    ) -> TransactionRecord {
        let value = round3(Decimal::from(shares) * price);
        TransactionRecord {
            symbol: SYMBOL.into(),
            name: "Infosys".into(),
            trade,
            mode,
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

    fn buy(on: NaiveDate, shares: u64, price: Decimal) -> TransactionRecord {
        rec(Trade::Buy, Mode::Delivery, on, shares, price, dec!(0))
    }

    fn sell(on: NaiveDate, shares: u64, price: Decimal) -> TransactionRecord {
        rec(Trade::Sell, Mode::Delivery, on, shares, price, dec!(0))
    }

    fn no_refs() -> HashMap<String, Decimal> {
        HashMap::new()
    }

    fn stock_with(records: Vec<TransactionRecord>) -> Stock {
        let mut stock = Stock::new(SYMBOL, "Infosys");
        for r in records {
            stock.put_transaction_to_queue(r).unwrap();
        }
        stock
    }

    #[test]
    fn routes_by_trade_and_mode() {
        let day = date(2020, 1, 1);
        let mut stock = stock_with(vec![
            buy(day, 10, dec!(1)),
            rec(Trade::Buy, Mode::SquareOff, day, 5, dec!(1), dec!(0)),
            sell(day, 3, dec!(1)),
            rec(Trade::Dividend, Mode::Cash, day, 0, dec!(0), dec!(0)),
            rec(Trade::CashIn, Mode::Cash, day, 0, dec!(0), dec!(0)),
        ]);
        assert_eq!(stock.delivery_buys().len(), 1);
        assert_eq!(stock.square_off_buys().len(), 1);
        assert_eq!(stock.sells().len(), 1);
        assert_eq!(stock.dividends().len(), 1);

        let err = stock
            .put_transaction_to_queue(rec(Trade::Sell, Mode::Cash, day, 1, dec!(1), dec!(0)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMode { trade: Trade::Sell, .. }));
    }

    #[test]
    fn fifo_priority_across_lots() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let mut stock = stock_with(vec![
            buy(date(2020, 1, 1), 100, dec!(10)),
            buy(date(2020, 1, 2), 50, dec!(11)),
            sell(date(2020, 1, 3), 120, dec!(12)),
        ]);

        stock.realize_whole(&calc).unwrap();

        let gains = stock.realized_gains();
        assert_eq!(gains.len(), 2);
        assert_eq!(gains[0].shares(), 100);
        assert_eq!(gains[0].buy.date, date(2020, 1, 1));
        assert_eq!(gains[1].shares(), 20);
        assert_eq!(gains[1].buy.date, date(2020, 1, 2));

        let left: Vec<_> = stock.delivery_buys().iter().collect();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].shares, 30);
        assert_eq!(left[0].date, date(2020, 1, 2));
    }

    #[test]
    fn several_sells_consume_one_lot_in_order() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let mut stock = stock_with(vec![
            buy(date(2020, 1, 1), 100, dec!(10)),
            sell(date(2020, 2, 1), 30, dec!(12)),
            sell(date(2020, 3, 1), 70, dec!(13)),
        ]);

        stock.realize_whole(&calc).unwrap();

        let gains = stock.realized_gains();
        assert_eq!(gains.len(), 2);
        assert_eq!(gains[0].shares(), 30);
        assert_eq!(gains[0].buy_value, dec!(300));
        assert_eq!(gains[1].shares(), 70);
        assert_eq!(gains[1].sell.date, date(2020, 3, 1));
        assert!(stock.delivery_buys().is_empty());
        assert!(!stock.has_open_delivery());
    }

    #[test]
    fn split_charges_are_conserved() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let mut stock = stock_with(vec![
            rec(Trade::Buy, Mode::Delivery, date(2020, 1, 1), 3, dec!(10), dec!(1)),
            rec(Trade::Sell, Mode::Delivery, date(2020, 2, 1), 1, dec!(11), dec!(0)),
            rec(Trade::Sell, Mode::Delivery, date(2020, 3, 1), 2, dec!(11), dec!(0)),
        ]);

        stock.realize_whole(&calc).unwrap();
        let charged: Decimal = stock.realized_gains().iter().map(|g| g.buy_charges).sum();
        assert!((charged - dec!(1)).abs() <= dec!(0.001));
    }

    #[test]
    fn square_off_sells_only_match_square_off_buys() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let day = date(2020, 5, 5);
        let mut stock = stock_with(vec![
            buy(date(2020, 1, 1), 10, dec!(10)),
            rec(Trade::Buy, Mode::SquareOff, day, 5, dec!(20), dec!(0)),
            rec(Trade::Sell, Mode::SquareOff, day, 5, dec!(21), dec!(0)),
        ]);

        stock.realize_whole(&calc).unwrap();
        assert_eq!(stock.realized_gains().len(), 1);
        assert_eq!(stock.realized_gains()[0].buy.mode, Mode::SquareOff);
        assert_eq!(stock.delivery_buys().total_shares(), 10);
        assert!(stock.square_off_buys().is_empty());
        assert!(stock.sells().is_empty());
    }

    #[test]
    fn sell_without_buy_is_fatal() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let mut stock = stock_with(vec![
            buy(date(2020, 1, 1), 10, dec!(10)),
            sell(date(2020, 2, 1), 15, dec!(12)),
        ]);

        let err = stock.realize_whole(&calc).unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnmatchedSell {
                symbol: SYMBOL.into(),
                date: date(2020, 2, 1),
                shares: 5,
            }
        );
    }

    #[test]
    fn leftover_square_off_is_fatal() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let day = date(2020, 5, 5);
        let mut stock = stock_with(vec![
            rec(Trade::Buy, Mode::SquareOff, day, 5, dec!(20), dec!(0)),
            rec(Trade::Sell, Mode::SquareOff, day, 3, dec!(21), dec!(0)),
        ]);

        let err = stock.realize_whole(&calc).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ResidualSquareOff { lots: 1, shares: 2, .. }
        ));
    }

    #[test]
    fn zero_share_sell_is_skipped_unless_it_carries_value() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let mut empty = sell(date(2020, 2, 1), 0, dec!(12));
        empty.receivable = dec!(0);
        let mut stock = stock_with(vec![buy(date(2020, 1, 1), 10, dec!(10)), empty]);
        stock.realize_whole(&calc).unwrap();
        assert!(stock.realized_gains().is_empty());

        let mut bad = sell(date(2020, 2, 1), 0, dec!(12));
        bad.value = dec!(5);
        let mut stock = stock_with(vec![buy(date(2020, 1, 1), 10, dec!(10)), bad]);
        assert!(matches!(
            stock.realize_whole(&calc),
            Err(LedgerError::ZeroShareResidue { .. })
        ));
    }

    #[test]
    fn holdings_use_one_market_price() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let mut stock = stock_with(vec![
            buy(date(2020, 1, 1), 100, dec!(10)),
            buy(date(2020, 6, 1), 50, dec!(11)),
            sell(date(2020, 7, 1), 120, dec!(12)),
        ]);
        stock.realize_whole(&calc).unwrap();

        let book = QuoteBook::new();
        book.insert(SYMBOL, dec!(15));
        let today = date(2021, 7, 1);
        stock.holding_whole(&calc, &book, today).unwrap();

        let holding = stock.holding_gains();
        assert_eq!(holding.len(), 1);
        assert_eq!(holding[0].shares(), 30);
        assert_eq!(holding[0].sell.date, today);
        assert_eq!(holding[0].sell_value, dec!(450));
        assert_eq!(holding[0].net_gain, dec!(120));
        assert_eq!(holding[0].term, TermClass::Long);
        assert!(stock.delivery_buys().is_empty());
    }

    #[test]
    fn shares_are_conserved() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let buys = vec![
            buy(date(2020, 1, 1), 40, dec!(10)),
            buy(date(2020, 1, 5), 25, dec!(10.5)),
            buy(date(2020, 2, 1), 60, dec!(9.75)),
        ];
        let bought: u64 = buys.iter().map(|b| b.shares).sum();
        let mut records = buys;
        records.push(sell(date(2020, 3, 1), 30, dec!(12)));
        records.push(sell(date(2020, 3, 2), 50, dec!(12)));
        let mut stock = stock_with(records);

        stock.realize_whole(&calc).unwrap();
        let book = QuoteBook::new();
        book.insert(SYMBOL, dec!(13));
        stock.holding_whole(&calc, &book, date(2020, 4, 1)).unwrap();

        let realized: u64 = stock.realized_gains().iter().map(|g| g.shares()).sum();
        let holding: u64 = stock.holding_gains().iter().map(|g| g.shares()).sum();
        assert_eq!(realized, 80);
        assert_eq!(realized + holding, bought);
    }

    #[test]
    fn failed_price_leaves_lots_in_place() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let mut stock = stock_with(vec![buy(date(2020, 1, 1), 10, dec!(10))]);
        stock.realize_whole(&calc).unwrap();

        let book = QuoteBook::new();
        let err = stock.holding_whole(&calc, &book, date(2021, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::MarketPrice {
                symbol: SYMBOL.into(),
                source: PriceError::Missing(SYMBOL.into()),
            }
        );
        assert_eq!(stock.delivery_buys().len(), 1);
        assert!(stock.holding_gains().is_empty());
    }

    #[test]
    fn no_open_lots_needs_no_price() {
        let refs = no_refs();
        let calc = GainCalculator::new(Grandfathering::default(), &refs);
        let mut stock = Stock::new(SYMBOL, "Infosys");
        let book = QuoteBook::new();
        stock.holding_whole(&calc, &book, date(2021, 1, 1)).unwrap();
        assert!(stock.holding_gains().is_empty());
    }
}
