//! # Pool Allocation Engine
//!
//! Month-by-month allocation of cost and revenue across a pool of legally
//! distinct companies that share part of a chart of accounts and a bench of
//! consultants.
//!
//! ## Core Concepts
//!
//! - **Primary / secondary companies**: a report is always written from the
//!   point of view of one primary company; its siblings form the secondary side
//!   of the pool
//! - **Shared accounts**: their monthly sum is split between the two sides in
//!   proportion to active consultant headcount
//! - **Salary accounts**: shared payroll is netted against the owner's
//!   consultant salaries (plus a fixed 2% buffer) before it is split
//! - **Lump sums**: manual corrections removed from the raw sum up front
//! - **Loan / debt**: what the primary owes the secondary side for its shared
//!   accounts, and what the secondary side owes the primary for theirs
//!
//! ## Example
//!
//! ```rust,ignore
//! use pool_allocation_engine::*;
//! use chrono::NaiveDate;
//!
//! let chart = ChartOfAccounts::new(companies, categories);
//! let ledger = LedgerIndex::from_entries(&entries);
//! let lump_sums = LumpSumBook::from_corrections(&corrections);
//! let consultants = ConsultantPoolAggregator::from_records(&employee_months);
//!
//! let config = AllocationConfig::new(
//!     acme.id,
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//! );
//!
//! let report = AllocationReportBuilder::new(&chart, &ledger, &lump_sums, &consultants)
//!     .ledger_report(&config)?;
//! ```

pub mod chart_of_accounts;
pub mod consultants;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod lump_sums;
pub mod period;
pub mod report;
pub mod schema;
pub mod sources;
pub mod utils;

pub use chart_of_accounts::ChartOfAccounts;
pub use consultants::{ConsultantPoolAggregator, SnapshotTable};
pub use engine::{
    AccountAllocationEngine, AccountAmounts, AllocationMode, AllocationOutcome, AllocationResult,
    CompanyPool, PoolMember, PoolSide,
};
pub use error::{AllocationError, Result};
pub use ingestion::LedgerIndex;
pub use lump_sums::LumpSumBook;
pub use period::{MonthIter, MonthPeriod};
pub use report::{
    AccountLedgerLine, AllocationReportBuilder, CategoryLedger, CategoryTotals,
    CategoryTotalsReport, LedgerReport, PeriodSummary, ReportGranularity,
};
pub use schema::*;
pub use sources::{LedgerSource, LumpSumSource, SnapshotSource};
pub use utils::*;

use log::info;

/// Everything one report run reads, already loaded into memory.
pub struct AllocationInputs {
    pub chart: ChartOfAccounts,
    pub ledger: LedgerIndex,
    pub lump_sums: LumpSumBook,
    pub consultants: ConsultantPoolAggregator,
}

impl AllocationInputs {
    pub fn new(
        chart: ChartOfAccounts,
        entries: &[LedgerEntry],
        corrections: &[LumpSumCorrection],
        employee_months: &[EmployeeMonth],
    ) -> Self {
        info!(
            "Loading allocation inputs: {} companies, {} accounts, {} ledger entries, {} lump sums, {} employee records",
            chart.companies.len(),
            chart.total_accounts(),
            entries.len(),
            corrections.len(),
            employee_months.len()
        );

        Self {
            chart,
            ledger: LedgerIndex::from_entries(entries),
            lump_sums: LumpSumBook::from_corrections(corrections),
            consultants: ConsultantPoolAggregator::from_records(employee_months),
        }
    }

    pub fn builder(&self) -> AllocationReportBuilder<'_> {
        AllocationReportBuilder::new(&self.chart, &self.ledger, &self.lump_sums, &self.consultants)
    }
}

pub fn process_ledger_report(inputs: &AllocationInputs, config: &AllocationConfig) -> Result<LedgerReport> {
    inputs.builder().ledger_report(config)
}

pub fn process_category_totals(
    inputs: &AllocationInputs,
    config: &AllocationConfig,
    granularity: ReportGranularity,
) -> Result<CategoryTotalsReport> {
    inputs.builder().category_totals(config, granularity)
}

pub fn process_period_summary(
    inputs: &AllocationInputs,
    config: &AllocationConfig,
    category: &str,
) -> Result<PeriodSummary> {
    inputs.builder().period_summary(config, category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_end_to_end_single_company() {
        let acme = Company::new("Acme ApS");
        let rent = AccountingAccount::new(acme.id, 2210, "Rent").shared();
        let chart = ChartOfAccounts::new(
            vec![acme.clone()],
            vec![AccountingCategory::new("Premises", vec![rent])],
        );
        let oct = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let inputs = AllocationInputs::new(
            chart,
            &[LedgerEntry {
                company: acme.id,
                account_code: 2210,
                date: oct,
                amount: 12_000.0,
            }],
            &[],
            &[EmployeeMonth {
                employee: EmployeeId::new(),
                company: acme.id,
                month: oct,
                status: EmployeeStatus::Active,
                consultant_type: ConsultantType::Consultant,
                salary: 40_000.0,
            }],
        );
        let config = AllocationConfig::new(acme.id, oct, NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());

        let ledger = process_ledger_report(&inputs, &config).unwrap();
        assert_eq!(ledger.loan_total(), 0.0);

        // With no siblings the whole shared cost stays with the primary.
        let summary = process_period_summary(&inputs, &config, "Premises").unwrap();
        assert!((summary.total() - 12_000.0).abs() < 0.01);

        let totals = process_category_totals(&inputs, &config, ReportGranularity::Period).unwrap();
        assert!((totals.totals(oct, "Premises").unwrap().primary_sum - 12_000.0).abs() < 0.01);
    }
}
