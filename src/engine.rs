//! Per-account, per-month allocation across a pool of companies.
//!
//! Every evaluation runs the same pipeline, in this order:
//!
//! 1. raw ledger sum (always reported)
//! 2. shared accounts with a non-positive raw sum drop out of redistribution
//! 3. lump-sum correction is removed
//! 4. shared salary accounts add dedicated payroll from sibling accounts and
//!    net out the owner's consultant salaries (with [`SALARY_BUFFER_FACTOR`])
//! 5. a non-positive remainder contributes nothing
//! 6. shared accounts are split by consultant headcount
//! 7. results are clamped at zero
//!
//! Results are fresh values. Accounts, snapshots and sources are only read.

use crate::error::{AllocationError, Result};
use crate::schema::{
    AccountId, AccountingAccount, AccountingCategory, CompanyId, ConsultantPoolSnapshot,
    SALARY_BUFFER_FACTOR,
};
use crate::sources::LedgerSource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationMode {
    /// Loan/debt between the primary and the secondary side of the pool.
    Ledger,
    /// The owning side's normalized share of the cost.
    AdjustedSum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolSide {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolMember {
    pub company: CompanyId,
    pub snapshot: ConsultantPoolSnapshot,
}

impl PoolMember {
    pub fn new(company: CompanyId, snapshot: ConsultantPoolSnapshot) -> Self {
        Self { company, snapshot }
    }
}

/// The primary company and its secondaries, with their snapshots for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyPool {
    pub primary: PoolMember,
    pub secondaries: Vec<PoolMember>,
}

impl CompanyPool {
    pub fn new(primary: PoolMember, secondaries: Vec<PoolMember>) -> Self {
        Self {
            primary,
            secondaries,
        }
    }

    pub fn primary_consultants(&self) -> f64 {
        self.primary.snapshot.active_consultants
    }

    pub fn secondary_consultants(&self) -> f64 {
        self.secondaries
            .iter()
            .fold(0.0, |acc, member| acc + member.snapshot.active_consultants)
    }

    pub fn total_consultants(&self) -> f64 {
        self.primary_consultants() + self.secondary_consultants()
    }

    pub fn side_of(&self, company: CompanyId) -> Option<PoolSide> {
        if company == self.primary.company {
            Some(PoolSide::Primary)
        } else if self.secondaries.iter().any(|m| m.company == company) {
            Some(PoolSide::Secondary)
        } else {
            None
        }
    }

    pub fn member(&self, company: CompanyId) -> Option<&PoolMember> {
        std::iter::once(&self.primary)
            .chain(self.secondaries.iter())
            .find(|m| m.company == company)
    }
}

/// Ledger-derived amounts for one account and month.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountAmounts {
    pub raw_sum: f64,
    pub lump_sum: f64,
    /// Raw sums of the owner's dedicated (non-shared) salary accounts in the
    /// same category and month.
    pub other_salary_sources: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AllocationOutcome {
    Ledger { loan: f64, debt: f64 },
    AdjustedSum(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub account: AccountId,
    pub company: CompanyId,
    pub account_code: u32,
    pub month: NaiveDate,
    pub raw_sum: f64,
    pub lump_sum: f64,
    /// Amount entering proration after lump-sum removal and salary netting.
    pub basis: f64,
    /// Amount removed from the basis by salary netting.
    pub netted_salary: f64,
    /// Shared account left out of redistribution because its raw sum was not positive.
    pub excluded: bool,
    pub outcome: AllocationOutcome,
}

impl AllocationResult {
    pub fn loan(&self) -> f64 {
        match self.outcome {
            AllocationOutcome::Ledger { loan, .. } => loan,
            AllocationOutcome::AdjustedSum(_) => 0.0,
        }
    }

    pub fn debt(&self) -> f64 {
        match self.outcome {
            AllocationOutcome::Ledger { debt, .. } => debt,
            AllocationOutcome::AdjustedSum(_) => 0.0,
        }
    }

    pub fn adjusted_sum(&self) -> f64 {
        match self.outcome {
            AllocationOutcome::AdjustedSum(value) => value,
            AllocationOutcome::Ledger { .. } => 0.0,
        }
    }
}

/// Output of steps 2-5 of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProrationBasis {
    pub partial: f64,
    pub netted_salary: f64,
    pub excluded: bool,
}

pub fn proration_basis(
    account: &AccountingAccount,
    amounts: &AccountAmounts,
    own_salary_sum: f64,
) -> ProrationBasis {
    if account.shared && amounts.raw_sum <= 0.0 {
        return ProrationBasis {
            partial: 0.0,
            netted_salary: 0.0,
            excluded: true,
        };
    }

    let mut partial = amounts.raw_sum - amounts.lump_sum;
    let mut netted_salary = 0.0;

    if account.salary && account.shared {
        partial += amounts.other_salary_sources;
        let before = partial;
        partial = (partial - own_salary_sum * SALARY_BUFFER_FACTOR).max(0.0);
        netted_salary = before - partial;
    }

    ProrationBasis {
        partial: partial.max(0.0),
        netted_salary,
        excluded: false,
    }
}

/// `partial * share / total`, or zero when there is nothing to split.
pub fn prorate(partial: f64, share: f64, total: f64) -> f64 {
    if total <= 0.0 || partial <= 0.0 {
        return 0.0;
    }
    (partial * (share / total)).max(0.0)
}

/// Sum of the raw ledger amounts on the owner's dedicated salary accounts in
/// `category`, excluding `account` itself.
pub fn other_salary_sources(
    category: &AccountingCategory,
    account: &AccountingAccount,
    month: NaiveDate,
    ledger: &dyn LedgerSource,
) -> f64 {
    category
        .accounts
        .iter()
        .filter(|other| {
            other.id != account.id && other.company == account.company && other.is_dedicated_salary()
        })
        .map(|other| ledger.sum_by_account_and_month(other.company, other.account_code, month))
        .sum()
}

pub struct AccountAllocationEngine {
    mode: AllocationMode,
}

impl AccountAllocationEngine {
    pub fn new(mode: AllocationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AllocationMode {
        self.mode
    }

    pub fn allocate(
        &self,
        account: &AccountingAccount,
        month: NaiveDate,
        pool: &CompanyPool,
        amounts: AccountAmounts,
    ) -> Result<AllocationResult> {
        let side = pool
            .side_of(account.company)
            .ok_or(AllocationError::CompanyNotInPool(account.company))?;
        let own_salary_sum = pool
            .member(account.company)
            .map(|m| m.snapshot.salary_sum)
            .unwrap_or(0.0);

        let basis = proration_basis(account, &amounts, own_salary_sum);

        let outcome = if account.shared {
            self.prorate_shared(side, basis.partial, pool)
        } else {
            match self.mode {
                AllocationMode::Ledger => AllocationOutcome::Ledger {
                    loan: 0.0,
                    debt: 0.0,
                },
                AllocationMode::AdjustedSum => AllocationOutcome::AdjustedSum(basis.partial),
            }
        };

        Ok(AllocationResult {
            account: account.id,
            company: account.company,
            account_code: account.account_code,
            month,
            raw_sum: amounts.raw_sum,
            lump_sum: amounts.lump_sum,
            basis: basis.partial,
            netted_salary: basis.netted_salary,
            excluded: basis.excluded,
            outcome,
        })
    }

    fn prorate_shared(&self, side: PoolSide, partial: f64, pool: &CompanyPool) -> AllocationOutcome {
        let primary = pool.primary_consultants();
        let secondary = pool.secondary_consultants();
        let total = primary + secondary;

        // Ledger mode books what each side owes the other side of the pool;
        // adjusted-sum mode keeps the owning side's own share.
        match (self.mode, side) {
            (AllocationMode::Ledger, PoolSide::Primary) => AllocationOutcome::Ledger {
                loan: prorate(partial, secondary, total),
                debt: 0.0,
            },
            (AllocationMode::Ledger, PoolSide::Secondary) => AllocationOutcome::Ledger {
                loan: 0.0,
                debt: prorate(partial, primary, total),
            },
            (AllocationMode::AdjustedSum, PoolSide::Primary) => {
                AllocationOutcome::AdjustedSum(prorate(partial, primary, total))
            }
            (AllocationMode::AdjustedSum, PoolSide::Secondary) => {
                AllocationOutcome::AdjustedSum(prorate(partial, secondary, total))
            }
        }
    }
}
