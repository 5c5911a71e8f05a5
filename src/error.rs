use crate::schema::{AccountId, CompanyId};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Company not found: {0}")]
    CompanyNotFound(CompanyId),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Company {0} is not part of the allocation pool")]
    CompanyNotInPool(CompanyId),

    #[error("Invalid period: from {from} must be before to {to}")]
    InvalidPeriod { from: NaiveDate, to: NaiveDate },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AllocationError {
    /// True for the lookup failures a caller surfaces as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CompanyNotFound(_) | Self::AccountNotFound(_) | Self::CategoryNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AllocationError>;
