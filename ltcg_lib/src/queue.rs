//! Ordered, double-ended queue of pending lots.

use std::collections::VecDeque;

use crate::error::LedgerError;
use crate::transaction::TransactionRecord;

/// Lots of one (security, trade category), oldest first.
///
/// New records join at the back in ingestion order. `push_front` is only used
/// to put back the unconsumed remainder of a split lot so it is matched
/// before anything queued after it.
#[derive(Debug, Clone, Default)]
pub struct TransactionQueue {
    items: VecDeque<TransactionRecord>,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push_back(&mut self, record: TransactionRecord) {
        self.items.push_back(record);
    }

    pub fn push_front(&mut self, record: TransactionRecord) {
        self.items.push_front(record);
    }

    pub fn pop_front(&mut self) -> Result<TransactionRecord, LedgerError> {
        self.items.pop_front().ok_or(LedgerError::QueueUnderflow)
    }

    pub fn front(&self) -> Option<&TransactionRecord> {
        self.items.front()
    }

    /// Current contents in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> + '_ {
        self.items.iter()
    }

    /// Sum of shares over every queued record.
    pub fn total_shares(&self) -> u64 {
        self.items.iter().map(|r| r.shares).sum()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a> IntoIterator for &'a TransactionQueue {
    type Item = &'a TransactionRecord;
    type IntoIter = std::collections::vec_deque::Iter<'a, TransactionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Mode, Trade};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn lot(day: u32, shares: u64) -> TransactionRecord {
        TransactionRecord {
            symbol: "NSE:TCS".into(),
            name: "Tata Consultancy".into(),
            trade: Trade::Buy,
            mode: Mode::Delivery,
            date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            shares,
            price: dec!(2000),
            value: dec!(2000) * rust_decimal::Decimal::from(shares),
            brokerage: dec!(0),
            stt: dec!(0),
            charges: dec!(0),
            receivable: dec!(0),
        }
    }

    #[test]
    fn fifo_order() {
        let mut q = TransactionQueue::new();
        q.push_back(lot(1, 10));
        q.push_back(lot(2, 20));
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop_front().unwrap().shares, 10);
        assert_eq!(q.pop_front().unwrap().shares, 20);
        assert!(q.is_empty());
    }

    #[test]
    fn push_front_takes_priority() {
        let mut q = TransactionQueue::new();
        q.push_back(lot(2, 20));
        q.push_front(lot(1, 5));
        assert_eq!(q.front().unwrap().shares, 5);
        assert_eq!(q.pop_front().unwrap().date.to_string(), "2020-01-01");
    }

    #[test]
    fn pop_from_empty_underflows() {
        let mut q = TransactionQueue::new();
        assert_eq!(q.pop_front(), Err(LedgerError::QueueUnderflow));
    }

    #[test]
    fn iteration_reflects_current_contents() {
        let mut q = TransactionQueue::new();
        q.push_back(lot(1, 10));
        q.push_back(lot(2, 20));
        assert_eq!(q.iter().map(|r| r.shares).collect::<Vec<_>>(), vec![10, 20]);

        q.pop_front().unwrap();
        q.push_back(lot(3, 30));
        let shares: Vec<u64> = (&q).into_iter().map(|r| r.shares).collect();
        assert_eq!(shares, vec![20, 30]);
        assert_eq!(q.total_shares(), 50);
    }
}
