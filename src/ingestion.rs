use crate::error::Result;
use crate::period::MonthPeriod;
use crate::schema::{CompanyId, LedgerEntry};
use crate::sources::LedgerSource;
use crate::utils::first_of_month;
use chrono::NaiveDate;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

type LedgerKey = (CompanyId, u32, NaiveDate);

/// Ledger entries pre-grouped by (company, account code, month).
///
/// Built once per report from a bulk read, then queried in memory.
#[derive(Debug, Clone, Default)]
pub struct LedgerIndex {
    sums: BTreeMap<LedgerKey, f64>,
    entry_count: usize,
}

impl LedgerIndex {
    pub fn from_entries(entries: &[LedgerEntry]) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.push(entry);
        }
        debug!(
            "Indexed {} ledger entries into {} account-months",
            index.entry_count,
            index.sums.len()
        );
        index
    }

    pub fn from_entries_in(entries: &[LedgerEntry], period: &MonthPeriod) -> Self {
        let mut index = Self::default();
        for entry in entries.iter().filter(|e| period.contains(e.date)) {
            index.push(entry);
        }
        index
    }

    /// Reads `company,account_code,date,amount` rows with a header line.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut index = Self::default();
        for row in csv_reader.deserialize::<LedgerEntry>() {
            index.push(&row?);
        }
        debug!("Loaded {} ledger entries from CSV", index.entry_count);
        Ok(index)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn restricted_to(&self, period: &MonthPeriod) -> Self {
        let sums: BTreeMap<LedgerKey, f64> = self
            .sums
            .iter()
            .filter(|((_, _, month), _)| period.contains(*month))
            .map(|(k, v)| (*k, *v))
            .collect();
        Self {
            entry_count: sums.len(),
            sums,
        }
    }

    fn push(&mut self, entry: &LedgerEntry) {
        let key = (entry.company, entry.account_code, first_of_month(entry.date));
        *self.sums.entry(key).or_default() += entry.amount;
        self.entry_count += 1;
    }

    pub fn months(&self) -> BTreeSet<NaiveDate> {
        self.sums.keys().map(|(_, _, month)| *month).collect()
    }

    /// Number of entries folded in. An index produced by `restricted_to`
    /// counts account-months instead.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

impl LedgerSource for LedgerIndex {
    fn sum_by_account_and_month(
        &self,
        company: CompanyId,
        account_code: u32,
        month: NaiveDate,
    ) -> f64 {
        self.sums
            .get(&(company, account_code, first_of_month(month)))
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(company: CompanyId, code: u32, date: NaiveDate, amount: f64) -> LedgerEntry {
        LedgerEntry {
            company,
            account_code: code,
            date,
            amount,
        }
    }

    #[test]
    fn test_entries_grouped_by_month() {
        let acme = CompanyId::new();
        let index = LedgerIndex::from_entries(&[
            entry(acme, 3502, date(2024, 10, 3), 60_000.0),
            entry(acme, 3502, date(2024, 10, 28), 40_000.0),
            entry(acme, 3502, date(2024, 11, 1), 7_000.0),
            entry(acme, 2210, date(2024, 10, 5), -500.0),
        ]);

        assert_eq!(index.entry_count(), 4);
        assert!((index.sum_by_account_and_month(acme, 3502, date(2024, 10, 1)) - 100_000.0).abs() < 0.01);
        assert!((index.sum_by_account_and_month(acme, 3502, date(2024, 11, 15)) - 7_000.0).abs() < 0.01);
        assert!((index.sum_by_account_and_month(acme, 2210, date(2024, 10, 1)) + 500.0).abs() < 0.01);
    }

    #[test]
    fn test_missing_sums_read_as_zero() {
        let index = LedgerIndex::default();
        assert_eq!(
            index.sum_by_account_and_month(CompanyId::new(), 1000, date(2024, 1, 1)),
            0.0
        );
    }

    #[test]
    fn test_companies_kept_apart() {
        let acme = CompanyId::new();
        let globex = CompanyId::new();
        let index = LedgerIndex::from_entries(&[
            entry(acme, 4000, date(2024, 1, 10), 100.0),
            entry(globex, 4000, date(2024, 1, 10), 250.0),
        ]);
        assert!((index.sum_by_account_and_month(acme, 4000, date(2024, 1, 1)) - 100.0).abs() < 0.01);
        assert!((index.sum_by_account_and_month(globex, 4000, date(2024, 1, 1)) - 250.0).abs() < 0.01);
    }

    #[test]
    fn test_restriction_to_period() {
        let acme = CompanyId::new();
        let entries = vec![
            entry(acme, 4000, date(2023, 12, 31), 1.0),
            entry(acme, 4000, date(2024, 1, 1), 2.0),
            entry(acme, 4000, date(2024, 2, 1), 4.0),
        ];
        let period = MonthPeriod::new(date(2024, 1, 1), date(2024, 2, 1));

        let filtered = LedgerIndex::from_entries_in(&entries, &period);
        assert_eq!(filtered.months().len(), 1);
        assert!((filtered.sum_by_account_and_month(acme, 4000, date(2024, 1, 1)) - 2.0).abs() < 0.01);

        let restricted = LedgerIndex::from_entries(&entries).restricted_to(&period);
        assert_eq!(restricted.months(), filtered.months());
    }

    #[test]
    fn test_csv_loading() {
        let acme = CompanyId::new();
        let data = format!(
            "company,account_code,date,amount\n{acme},3502,2024-10-03,1200.50\n{acme},3502,2024-10-20,-200.50\n"
        );
        let index = LedgerIndex::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(index.entry_count(), 2);
        assert!((index.sum_by_account_and_month(acme, 3502, date(2024, 10, 1)) - 1000.0).abs() < 0.01);
    }

    #[test]
    fn test_csv_rejects_bad_rows() {
        let data = "company,account_code,date,amount\nnot-a-uuid,3502,2024-10-03,1.0\n";
        assert!(LedgerIndex::from_csv_reader(data.as_bytes()).is_err());
    }
}
