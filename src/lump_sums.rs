use crate::schema::{AccountId, LumpSumCorrection};
use crate::sources::LumpSumSource;
use crate::utils::first_of_month;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Manually entered corrections, keyed by account and month.
///
/// Several corrections on the same account and month add up.
#[derive(Debug, Clone, Default)]
pub struct LumpSumBook {
    amounts: BTreeMap<(AccountId, NaiveDate), f64>,
}

impl LumpSumBook {
    pub fn from_corrections(corrections: &[LumpSumCorrection]) -> Self {
        let mut amounts = BTreeMap::new();
        for correction in corrections {
            *amounts
                .entry((correction.account, first_of_month(correction.month)))
                .or_default() += correction.amount;
        }
        Self { amounts }
    }

    pub fn lump_sum(&self, account: AccountId, month: NaiveDate) -> f64 {
        self.amounts
            .get(&(account, first_of_month(month)))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total_for(&self, account: AccountId) -> f64 {
        self.amounts
            .iter()
            .filter(|((id, _), _)| *id == account)
            .map(|(_, amount)| amount)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

impl LumpSumSource for LumpSumBook {
    fn lump_sum(&self, account: AccountId, month: NaiveDate) -> f64 {
        LumpSumBook::lump_sum(self, account, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn correction(account: AccountId, month: NaiveDate, amount: f64) -> LumpSumCorrection {
        LumpSumCorrection {
            account,
            month,
            amount,
            description: None,
        }
    }

    #[test]
    fn test_defaults_to_zero() {
        let book = LumpSumBook::default();
        assert_eq!(book.lump_sum(AccountId::new(), date(2024, 10, 1)), 0.0);
    }

    #[test]
    fn test_corrections_in_same_month_add_up() {
        let account = AccountId::new();
        let book = LumpSumBook::from_corrections(&[
            correction(account, date(2024, 10, 1), 3_000.0),
            correction(account, date(2024, 10, 20), 2_000.0),
            correction(account, date(2024, 11, 1), 750.0),
        ]);

        assert!((book.lump_sum(account, date(2024, 10, 1)) - 5_000.0).abs() < 0.01);
        assert!((book.lump_sum(account, date(2024, 11, 1)) - 750.0).abs() < 0.01);
        assert!((book.total_for(account) - 5_750.0).abs() < 0.01);
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_other_accounts_unaffected() {
        let account = AccountId::new();
        let book = LumpSumBook::from_corrections(&[correction(account, date(2024, 10, 1), 1.0)]);
        assert_eq!(book.lump_sum(AccountId::new(), date(2024, 10, 1)), 0.0);
    }
}
