use crate::chart_of_accounts::ChartOfAccounts;
use crate::consultants::SnapshotTable;
use crate::engine::{
    other_salary_sources, AccountAllocationEngine, AccountAmounts, AllocationMode,
    AllocationResult, CompanyPool, PoolMember, PoolSide,
};
use crate::error::Result;
use crate::period::MonthPeriod;
use crate::schema::{AccountId, AccountingAccount, AccountingCategory, AllocationConfig, CompanyId};
use crate::sources::{LedgerSource, LumpSumSource, SnapshotSource};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLedgerLine {
    pub account: AccountId,
    pub company: CompanyId,
    pub account_code: u32,
    pub name: String,
    pub raw_sum: f64,
    pub lump_sum: f64,
    /// Owed by the primary to the secondary side (primary-owned shared accounts).
    pub loan: f64,
    /// Owed to the primary by the secondary side (secondary-owned shared accounts).
    pub debt: f64,
    pub excluded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLedger {
    pub category: String,
    pub lines: Vec<AccountLedgerLine>,
    pub primary_sum: f64,
    pub secondary_sum: f64,
    pub loan_total: f64,
    pub debt_total: f64,
}

/// Month → category → account breakdown of raw sums, loans and debts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReport {
    pub primary: CompanyId,
    pub secondaries: Vec<CompanyId>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub months: BTreeMap<NaiveDate, Vec<CategoryLedger>>,
}

impl LedgerReport {
    pub fn loan_total(&self) -> f64 {
        self.categories().map(|c| c.loan_total).sum()
    }

    pub fn debt_total(&self) -> f64 {
        self.categories().map(|c| c.debt_total).sum()
    }

    /// Positive when the secondary side owes the primary on balance.
    pub fn net_balance(&self) -> f64 {
        self.debt_total() - self.loan_total()
    }

    pub fn category(&self, month: NaiveDate, name: &str) -> Option<&CategoryLedger> {
        self.months.get(&month)?.iter().find(|c| c.category == name)
    }

    fn categories(&self) -> impl Iterator<Item = &CategoryLedger> {
        self.months.values().flatten()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportGranularity {
    /// One set of totals covering the whole period.
    #[default]
    Period,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub category: String,
    pub primary_sum: f64,
    pub secondary_sum: f64,
    pub adjusted_primary_sum: f64,
    pub adjusted_secondary_sum: f64,
}

impl CategoryTotals {
    pub fn empty(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            primary_sum: 0.0,
            secondary_sum: 0.0,
            adjusted_primary_sum: 0.0,
            adjusted_secondary_sum: 0.0,
        }
    }

    fn with(self, result: &AllocationResult, side: PoolSide) -> Self {
        match side {
            PoolSide::Primary => Self {
                primary_sum: self.primary_sum + result.raw_sum,
                adjusted_primary_sum: self.adjusted_primary_sum + result.adjusted_sum(),
                ..self
            },
            PoolSide::Secondary => Self {
                secondary_sum: self.secondary_sum + result.raw_sum,
                adjusted_secondary_sum: self.adjusted_secondary_sum + result.adjusted_sum(),
                ..self
            },
        }
    }

    fn combine(self, other: &CategoryTotals) -> Self {
        Self {
            primary_sum: self.primary_sum + other.primary_sum,
            secondary_sum: self.secondary_sum + other.secondary_sum,
            adjusted_primary_sum: self.adjusted_primary_sum + other.adjusted_primary_sum,
            adjusted_secondary_sum: self.adjusted_secondary_sum + other.adjusted_secondary_sum,
            ..self
        }
    }
}

/// Category totals keyed by the first month each bucket covers. A
/// [`ReportGranularity::Period`] report has a single bucket keyed by `from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotalsReport {
    pub primary: CompanyId,
    pub secondaries: Vec<CompanyId>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub granularity: ReportGranularity,
    pub periods: BTreeMap<NaiveDate, Vec<CategoryTotals>>,
}

impl CategoryTotalsReport {
    pub fn totals(&self, bucket: NaiveDate, category: &str) -> Option<&CategoryTotals> {
        self.periods.get(&bucket)?.iter().find(|t| t.category == category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub category: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Primary company's raw ledger sum for the category.
    pub raw_sum: f64,
    /// Primary company's adjusted sum for the category.
    pub adjusted_sum: f64,
    pub loan_sum: f64,
    pub debt_sum: f64,
}

impl PeriodSummary {
    pub fn total(&self) -> f64 {
        self.adjusted_sum
    }
}

struct ReportContext {
    primary: CompanyId,
    secondaries: Vec<CompanyId>,
    period: MonthPeriod,
    snapshots: SnapshotTable,
}

impl ReportContext {
    fn pool(&self, month: NaiveDate) -> CompanyPool {
        let member = |company| PoolMember::new(company, self.snapshots.get(company, month));
        CompanyPool::new(
            member(self.primary),
            self.secondaries.iter().map(|&id| member(id)).collect(),
        )
    }
}

/// Walks categories × accounts × months and folds engine results into the
/// supported report shapes.
pub struct AllocationReportBuilder<'a> {
    chart: &'a ChartOfAccounts,
    ledger: &'a dyn LedgerSource,
    lump_sums: &'a dyn LumpSumSource,
    consultants: &'a dyn SnapshotSource,
}

impl<'a> AllocationReportBuilder<'a> {
    pub fn new(
        chart: &'a ChartOfAccounts,
        ledger: &'a dyn LedgerSource,
        lump_sums: &'a dyn LumpSumSource,
        consultants: &'a dyn SnapshotSource,
    ) -> Self {
        Self {
            chart,
            ledger,
            lump_sums,
            consultants,
        }
    }

    pub fn ledger_report(&self, config: &AllocationConfig) -> Result<LedgerReport> {
        let ctx = self.prepare(config, "ledger")?;
        let engine = AccountAllocationEngine::new(AllocationMode::Ledger);
        let mut months = BTreeMap::new();

        for month in &ctx.period {
            let pool = ctx.pool(month);
            let mut categories = Vec::with_capacity(self.chart.categories.len());

            for category in self.chart.list_categories() {
                let results = self.evaluate_category(&engine, category, month, &pool)?;
                categories.push(ledger_for_category(category, &results, &pool));
            }

            months.insert(month, categories);
        }

        Ok(LedgerReport {
            primary: ctx.primary,
            secondaries: ctx.secondaries,
            from: ctx.period.from(),
            to: ctx.period.to(),
            months,
        })
    }

    pub fn category_totals(
        &self,
        config: &AllocationConfig,
        granularity: ReportGranularity,
    ) -> Result<CategoryTotalsReport> {
        let ctx = self.prepare(config, "category totals")?;
        let engine = AccountAllocationEngine::new(AllocationMode::AdjustedSum);
        let mut periods: BTreeMap<NaiveDate, Vec<CategoryTotals>> = BTreeMap::new();

        for month in &ctx.period {
            let pool = ctx.pool(month);
            let bucket = match granularity {
                ReportGranularity::Period => ctx.period.from(),
                ReportGranularity::Monthly => month,
            };

            let mut monthly = Vec::with_capacity(self.chart.categories.len());
            for category in self.chart.list_categories() {
                let results = self.evaluate_category(&engine, category, month, &pool)?;
                let totals = fold_totals(&category.name, &results, &pool);
                debug!(
                    "{} {}: primary {:.2} (adjusted {:.2}), secondary {:.2} (adjusted {:.2})",
                    month,
                    category.name,
                    totals.primary_sum,
                    totals.adjusted_primary_sum,
                    totals.secondary_sum,
                    totals.adjusted_secondary_sum
                );
                monthly.push(totals);
            }

            match periods.remove(&bucket) {
                Some(existing) => {
                    let merged = existing
                        .into_iter()
                        .zip(monthly.iter())
                        .map(|(acc, next)| acc.combine(next))
                        .collect();
                    periods.insert(bucket, merged);
                }
                None => {
                    periods.insert(bucket, monthly);
                }
            }
        }

        Ok(CategoryTotalsReport {
            primary: ctx.primary,
            secondaries: ctx.secondaries,
            from: ctx.period.from(),
            to: ctx.period.to(),
            granularity,
            periods,
        })
    }

    pub fn period_summary(&self, config: &AllocationConfig, category_name: &str) -> Result<PeriodSummary> {
        let category = self.chart.find_category(category_name)?;
        let ctx = self.prepare(config, "period summary")?;
        let ledger_engine = AccountAllocationEngine::new(AllocationMode::Ledger);
        let adjusted_engine = AccountAllocationEngine::new(AllocationMode::AdjustedSum);

        let mut summary = PeriodSummary {
            category: category.name.clone(),
            from: ctx.period.from(),
            to: ctx.period.to(),
            raw_sum: 0.0,
            adjusted_sum: 0.0,
            loan_sum: 0.0,
            debt_sum: 0.0,
        };

        for month in &ctx.period {
            let pool = ctx.pool(month);
            for account in pooled_accounts(category, &pool) {
                let amounts = self.amounts_for(category, account, month);
                let ledger = ledger_engine.allocate(account, month, &pool, amounts)?;
                summary.loan_sum += ledger.loan();
                summary.debt_sum += ledger.debt();

                if account.company == ctx.primary {
                    let adjusted = adjusted_engine.allocate(account, month, &pool, amounts)?;
                    summary.raw_sum += adjusted.raw_sum;
                    summary.adjusted_sum += adjusted.adjusted_sum();
                }
            }
        }

        Ok(summary)
    }

    fn prepare(&self, config: &AllocationConfig, report: &str) -> Result<ReportContext> {
        config.validate()?;
        self.chart.find_company(config.primary_company)?;

        let secondaries: Vec<CompanyId> = match &config.secondary_companies {
            Some(ids) => {
                for &id in ids {
                    self.chart.find_company(id)?;
                }
                ids.clone()
            }
            None => self
                .chart
                .list_companies()
                .iter()
                .map(|c| c.id)
                .filter(|&id| id != config.primary_company)
                .collect(),
        };

        let period = config.period();
        info!(
            "Building {} report for {} with {} secondary companies, {} to {} ({:?})",
            report,
            self.chart.company_name(config.primary_company),
            secondaries.len(),
            period.from(),
            period.to(),
            config.headcount_mode
        );

        let outside_pool = self
            .chart
            .list_categories()
            .iter()
            .flat_map(|c| c.accounts.iter())
            .filter(|a| a.company != config.primary_company && !secondaries.contains(&a.company))
            .count();
        if outside_pool > 0 {
            warn!(
                "Skipping {} accounts owned by companies outside the allocation pool",
                outside_pool
            );
        }

        let mut companies = Vec::with_capacity(secondaries.len() + 1);
        companies.push(config.primary_company);
        companies.extend(secondaries.iter().copied());
        let snapshots = SnapshotTable::build(self.consultants, &companies, &period, config.headcount_mode);

        let ctx = ReportContext {
            primary: config.primary_company,
            secondaries,
            period,
            snapshots,
        };

        for month in &ctx.period {
            let pool = ctx.pool(month);
            debug!(
                "{}: primary {:.2} consultants, secondary {:.2} consultants",
                month,
                pool.primary_consultants(),
                pool.secondary_consultants()
            );
            if pool.total_consultants() <= 0.0 {
                warn!("{}: no active consultants in the pool, shared accounts allocate nothing", month);
            }
        }

        Ok(ctx)
    }

    fn amounts_for(
        &self,
        category: &AccountingCategory,
        account: &AccountingAccount,
        month: NaiveDate,
    ) -> AccountAmounts {
        let other_salary_sources = if account.salary && account.shared {
            other_salary_sources(category, account, month, self.ledger)
        } else {
            0.0
        };

        AccountAmounts {
            raw_sum: self
                .ledger
                .sum_by_account_and_month(account.company, account.account_code, month),
            lump_sum: self.lump_sums.lump_sum(account.id, month),
            other_salary_sources,
        }
    }

    /// Engine results for the pooled accounts of `category`, each paired with its account.
    fn evaluate_category<'c>(
        &self,
        engine: &AccountAllocationEngine,
        category: &'c AccountingCategory,
        month: NaiveDate,
        pool: &CompanyPool,
    ) -> Result<Vec<(&'c AccountingAccount, AllocationResult)>> {
        pooled_accounts(category, pool)
            .map(|account| {
                let amounts = self.amounts_for(category, account, month);
                Ok((account, engine.allocate(account, month, pool, amounts)?))
            })
            .collect()
    }
}

fn pooled_accounts<'c, 'p>(
    category: &'c AccountingCategory,
    pool: &'p CompanyPool,
) -> impl Iterator<Item = &'c AccountingAccount> + 'p
where
    'c: 'p,
{
    category
        .accounts
        .iter()
        .filter(move |a| pool.side_of(a.company).is_some())
}

fn fold_totals(
    category: &str,
    results: &[(&AccountingAccount, AllocationResult)],
    pool: &CompanyPool,
) -> CategoryTotals {
    results
        .iter()
        .fold(CategoryTotals::empty(category), |acc, (_, result)| {
            match pool.side_of(result.company) {
                Some(side) => acc.with(result, side),
                None => acc,
            }
        })
}

fn ledger_for_category(
    category: &AccountingCategory,
    results: &[(&AccountingAccount, AllocationResult)],
    pool: &CompanyPool,
) -> CategoryLedger {
    let lines: Vec<AccountLedgerLine> = results
        .iter()
        .map(|(account, result)| AccountLedgerLine {
            account: result.account,
            company: result.company,
            account_code: result.account_code,
            name: account.name.clone(),
            raw_sum: result.raw_sum,
            lump_sum: result.lump_sum,
            loan: result.loan(),
            debt: result.debt(),
            excluded: result.excluded,
        })
        .collect();

    let (primary_sum, secondary_sum) = results.iter().fold((0.0, 0.0), |(p, s), (_, result)| {
        match pool.side_of(result.company) {
            Some(PoolSide::Primary) => (p + result.raw_sum, s),
            Some(PoolSide::Secondary) => (p, s + result.raw_sum),
            None => (p, s),
        }
    });

    CategoryLedger {
        category: category.name.clone(),
        primary_sum,
        secondary_sum,
        loan_total: lines.iter().map(|l| l.loan).sum(),
        debt_total: lines.iter().map(|l| l.debt).sum(),
        lines,
    }
}
