use crate::error::{AllocationError, Result};
use crate::period::MonthPeriod;
use crate::utils::{first_of_month, parse_month_range};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Fixed buffer applied to a company's consultant salary sum before it is
/// netted out of a shared salary account.
pub const SALARY_BUFFER_FACTOR: f64 = 1.02;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }
    };
}

define_id!(CompanyId);
define_id!(AccountId);
define_id!(EmployeeId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CompanyId::new(),
            name: name.into(),
        }
    }
}

/// One (company, account code) pair inside a category.
///
/// Carries only identity and flags. Sums computed for it live on
/// [`crate::engine::AllocationResult`], never on the account itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountingAccount {
    pub id: AccountId,
    pub company: CompanyId,
    pub account_code: u32,
    #[serde(default)]
    pub name: String,
    /// Cost is split across the company pool.
    #[serde(default)]
    pub shared: bool,
    /// Account carries payroll cost and is subject to salary netting.
    #[serde(default)]
    pub salary: bool,
}

impl AccountingAccount {
    pub fn new(company: CompanyId, account_code: u32, name: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(),
            company,
            account_code,
            name: name.into(),
            shared: false,
            salary: false,
        }
    }

    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    pub fn salary(mut self) -> Self {
        self.salary = true;
        self
    }

    /// Salary paid through a dedicated payroll account rather than a pooled one.
    pub fn is_dedicated_salary(&self) -> bool {
        self.salary && !self.shared
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountingCategory {
    pub name: String,
    pub accounts: Vec<AccountingAccount>,
}

impl AccountingCategory {
    pub fn new(name: impl Into<String>, accounts: Vec<AccountingAccount>) -> Self {
        let mut category = Self {
            name: name.into(),
            accounts,
        };
        category.sort_accounts();
        category
    }

    pub(crate) fn sort_accounts(&mut self) {
        self.accounts
            .sort_by(|a, b| a.account_code.cmp(&b.account_code).then(a.company.cmp(&b.company)));
    }

    /// Lowest account code in the category, used to order categories.
    pub fn first_account_code(&self) -> Option<u32> {
        self.accounts.iter().map(|a| a.account_code).min()
    }
}

/// A finance-detail record. Negative amounts are credits or refunds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerEntry {
    pub company: CompanyId,
    pub account_code: u32,
    pub date: NaiveDate,
    pub amount: f64,
}

/// Human-entered correction subtracted from an account's raw monthly sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LumpSumCorrection {
    pub account: AccountId,
    pub month: NaiveDate,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeStatus {
    Active,
    Preboarding,
    MaternityLeave,
    NonPayLeave,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultantType {
    Consultant,
    Staff,
    Student,
    External,
}

/// One employee's availability record for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmployeeMonth {
    pub employee: EmployeeId,
    pub company: CompanyId,
    pub month: NaiveDate,
    pub status: EmployeeStatus,
    pub consultant_type: ConsultantType,
    #[serde(default)]
    pub salary: f64,
}

impl EmployeeMonth {
    /// Active, billable consultant: the only records that drive proration.
    pub fn is_active_consultant(&self) -> bool {
        self.status == EmployeeStatus::Active && self.consultant_type == ConsultantType::Consultant
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConsultantPoolSnapshot {
    pub active_consultants: f64,
    pub salary_sum: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HeadcountMode {
    /// Consultants active in the evaluated month.
    #[default]
    PointInTime,
    /// Mean headcount over a trailing window ending at the evaluated month.
    PeriodAverage { months: u32 },
}

/// Parameters of one report run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AllocationConfig {
    #[schemars(description = "The company the report is about.")]
    pub primary_company: CompanyId,

    #[schemars(
        description = "Sibling companies sharing accounts with the primary. Omit to use every other registered company."
    )]
    #[serde(default)]
    pub secondary_companies: Option<Vec<CompanyId>>,

    #[schemars(description = "First month of the report (inclusive). Normalized to day 1.")]
    pub from: NaiveDate,

    #[schemars(description = "End of the report (exclusive).")]
    pub to: NaiveDate,

    #[serde(default)]
    pub headcount_mode: HeadcountMode,
}

impl AllocationConfig {
    pub fn new(primary_company: CompanyId, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            primary_company,
            secondary_companies: None,
            from,
            to,
            headcount_mode: HeadcountMode::PointInTime,
        }
    }

    /// Config covering a "YYYY-MM" or "YYYY-MM:YYYY-MM" range, both ends inclusive.
    pub fn for_months(primary_company: CompanyId, range: &str) -> Result<Self> {
        let (from, to) = parse_month_range(range)?;
        Ok(Self::new(primary_company, from, to))
    }

    pub fn with_secondaries(mut self, secondaries: Vec<CompanyId>) -> Self {
        self.secondary_companies = Some(secondaries);
        self
    }

    pub fn with_headcount_mode(mut self, mode: HeadcountMode) -> Self {
        self.headcount_mode = mode;
        self
    }

    pub fn period(&self) -> MonthPeriod {
        MonthPeriod::new(self.from, self.to)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        let from = first_of_month(self.from);
        if from >= self.to {
            return Err(AllocationError::InvalidPeriod { from, to: self.to });
        }

        if let Some(secondaries) = &self.secondary_companies {
            if secondaries.contains(&self.primary_company) {
                return Err(AllocationError::InvalidConfig(format!(
                    "Primary company {} is also listed as a secondary company",
                    self.primary_company
                )));
            }
            let mut seen = HashSet::new();
            for id in secondaries {
                if !seen.insert(id) {
                    return Err(AllocationError::InvalidConfig(format!(
                        "Secondary company {} is listed more than once",
                        id
                    )));
                }
            }
        }

        if let HeadcountMode::PeriodAverage { months } = self.headcount_mode {
            if months == 0 {
                return Err(AllocationError::InvalidConfig(
                    "PeriodAverage headcount window must cover at least one month".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AllocationConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}
