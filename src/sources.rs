//! Read-only views onto the data owned by the surrounding system.
//!
//! Absence is a valid answer for every source: a missing ledger sum or lump
//! sum reads as `0.0`, a missing snapshot as an empty pool.

use crate::schema::{AccountId, CompanyId, ConsultantPoolSnapshot, HeadcountMode};
use chrono::NaiveDate;

pub trait LedgerSource {
    /// Net ledger amount booked on `account_code` by `company` in `month`.
    fn sum_by_account_and_month(&self, company: CompanyId, account_code: u32, month: NaiveDate)
        -> f64;
}

pub trait LumpSumSource {
    fn lump_sum(&self, account: AccountId, month: NaiveDate) -> f64;
}

pub trait SnapshotSource {
    fn snapshot(&self, company: CompanyId, month: NaiveDate, mode: HeadcountMode)
        -> ConsultantPoolSnapshot;
}
