use crate::error::{AllocationError, Result};
use crate::schema::{AccountId, AccountingAccount, AccountingCategory, Company, CompanyId};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// The shared chart of accounts together with the registry of companies it
/// spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartOfAccounts {
    pub companies: Vec<Company>,
    pub categories: Vec<AccountingCategory>,
}

impl ChartOfAccounts {
    /// Categories are ordered by their lowest account code, accounts by code.
    pub fn new(companies: Vec<Company>, mut categories: Vec<AccountingCategory>) -> Self {
        for category in &mut categories {
            category.sort_accounts();
        }
        categories.sort_by(|a, b| {
            a.first_account_code()
                .unwrap_or(u32::MAX)
                .cmp(&b.first_account_code().unwrap_or(u32::MAX))
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            companies,
            categories,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let chart: Self = serde_json::from_str(json)?;
        Ok(Self::new(chart.companies, chart.categories))
    }

    pub fn list_categories(&self) -> &[AccountingCategory] {
        &self.categories
    }

    pub fn list_companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn find_company(&self, id: CompanyId) -> Result<&Company> {
        self.companies
            .iter()
            .find(|c| c.id == id)
            .ok_or(AllocationError::CompanyNotFound(id))
    }

    pub fn find_category(&self, name: &str) -> Result<&AccountingCategory> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| AllocationError::CategoryNotFound(name.to_string()))
    }

    pub fn find_account(&self, id: AccountId) -> Result<(&AccountingCategory, &AccountingAccount)> {
        self.categories
            .iter()
            .find_map(|category| {
                category
                    .accounts
                    .iter()
                    .find(|a| a.id == id)
                    .map(|account| (category, account))
            })
            .ok_or(AllocationError::AccountNotFound(id))
    }

    pub fn accounts_of(&self, company: CompanyId) -> impl Iterator<Item = &AccountingAccount> {
        self.categories
            .iter()
            .flat_map(|c| c.accounts.iter())
            .filter(move |a| a.company == company)
    }

    pub fn company_name(&self, id: CompanyId) -> String {
        self.find_company(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|_| id.to_string())
    }

    pub fn total_accounts(&self) -> usize {
        self.categories.iter().map(|c| c.accounts.len()).sum()
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// One row per account with a header line; text fields are quoted as needed.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["Category", "Account Code", "Account Name", "Company", "Shared", "Salary"])?;

        for category in &self.categories {
            for account in &category.accounts {
                csv.write_record([
                    category.name.clone(),
                    account.account_code.to_string(),
                    account.name.clone(),
                    self.company_name(account.company),
                    account.shared.to_string(),
                    account.salary.to_string(),
                ])?;
            }
        }

        csv.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| AllocationError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Chart of Accounts\n\n");

        output.push_str("## Companies\n\n");
        for company in &self.companies {
            output.push_str(&format!("- {}\n", company.name));
        }
        output.push('\n');

        for category in &self.categories {
            output.push_str(&format!("## {}\n\n", category.name));
            for account in &category.accounts {
                let shared_marker = if account.shared { " **[SHARED]**" } else { "" };
                let salary_marker = if account.salary { " **[SALARY]**" } else { "" };
                output.push_str(&format!(
                    "- {} {} ({}){}{}\n",
                    account.account_code,
                    account.name,
                    self.company_name(account.company),
                    shared_marker,
                    salary_marker
                ));
            }
            output.push('\n');
        }

        output
    }
}
