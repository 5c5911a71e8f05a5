use crate::period::MonthPeriod;
use crate::schema::{CompanyId, ConsultantPoolSnapshot, EmployeeId, EmployeeMonth, HeadcountMode};
use crate::sources::SnapshotSource;
use crate::utils::{first_of_month, prev_month};
use chrono::NaiveDate;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Point-in-time consultant headcount and salary per (company, month),
/// aggregated from employee availability records.
#[derive(Debug, Clone, Default)]
pub struct ConsultantPoolAggregator {
    monthly: BTreeMap<(CompanyId, NaiveDate), ConsultantPoolSnapshot>,
}

impl ConsultantPoolAggregator {
    pub fn from_records(records: &[EmployeeMonth]) -> Self {
        let mut seen: HashSet<(EmployeeId, CompanyId, NaiveDate)> = HashSet::new();
        let mut monthly: BTreeMap<(CompanyId, NaiveDate), ConsultantPoolSnapshot> = BTreeMap::new();

        for record in records.iter().filter(|r| r.is_active_consultant()) {
            let month = first_of_month(record.month);
            // An employee counts once per company and month, however many
            // availability rows the month carries.
            if !seen.insert((record.employee, record.company, month)) {
                continue;
            }
            let snapshot = monthly.entry((record.company, month)).or_default();
            snapshot.active_consultants += 1.0;
            snapshot.salary_sum += record.salary;
        }

        debug!(
            "Aggregated {} employee records into {} company-months",
            records.len(),
            monthly.len()
        );

        Self { monthly }
    }

    pub fn point_in_time(&self, company: CompanyId, month: NaiveDate) -> ConsultantPoolSnapshot {
        self.monthly
            .get(&(company, first_of_month(month)))
            .copied()
            .unwrap_or_default()
    }

    /// Headcount averaged over the `months` months ending at `month`;
    /// the salary sum stays point-in-time.
    pub fn period_average(
        &self,
        company: CompanyId,
        month: NaiveDate,
        months: u32,
    ) -> ConsultantPoolSnapshot {
        let current = self.point_in_time(company, month);
        if months == 0 {
            return current;
        }

        let mut cursor = first_of_month(month);
        let mut total = 0.0;
        for _ in 0..months {
            total += self.point_in_time(company, cursor).active_consultants;
            cursor = prev_month(cursor);
        }

        ConsultantPoolSnapshot {
            active_consultants: total / months as f64,
            salary_sum: current.salary_sum,
        }
    }
}

impl SnapshotSource for ConsultantPoolAggregator {
    fn snapshot(
        &self,
        company: CompanyId,
        month: NaiveDate,
        mode: HeadcountMode,
    ) -> ConsultantPoolSnapshot {
        match mode {
            HeadcountMode::PointInTime => self.point_in_time(company, month),
            HeadcountMode::PeriodAverage { months } => self.period_average(company, month, months),
        }
    }
}

/// Snapshots for every pool company and report month, evaluated once.
#[derive(Debug, Clone)]
pub struct SnapshotTable {
    mode: HeadcountMode,
    snapshots: HashMap<(CompanyId, NaiveDate), ConsultantPoolSnapshot>,
}

impl SnapshotTable {
    pub fn build(
        source: &dyn SnapshotSource,
        companies: &[CompanyId],
        period: &MonthPeriod,
        mode: HeadcountMode,
    ) -> Self {
        let mut snapshots = HashMap::new();
        for month in period {
            for &company in companies {
                snapshots
                    .entry((company, month))
                    .or_insert_with(|| source.snapshot(company, month, mode));
            }
        }
        Self { mode, snapshots }
    }

    pub fn mode(&self) -> HeadcountMode {
        self.mode
    }

    pub fn get(&self, company: CompanyId, month: NaiveDate) -> ConsultantPoolSnapshot {
        self.snapshots
            .get(&(company, first_of_month(month)))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConsultantType, EmployeeStatus};
    use std::cell::Cell;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(
        employee: EmployeeId,
        company: CompanyId,
        month: NaiveDate,
        status: EmployeeStatus,
        consultant_type: ConsultantType,
        salary: f64,
    ) -> EmployeeMonth {
        EmployeeMonth {
            employee,
            company,
            month,
            status,
            consultant_type,
            salary,
        }
    }

    #[test]
    fn test_only_active_consultants_count() {
        let acme = CompanyId::new();
        let oct = date(2024, 10, 1);
        let records = vec![
            record(EmployeeId::new(), acme, oct, EmployeeStatus::Active, ConsultantType::Consultant, 40_000.0),
            record(EmployeeId::new(), acme, oct, EmployeeStatus::Active, ConsultantType::Consultant, 45_000.0),
            record(EmployeeId::new(), acme, oct, EmployeeStatus::Active, ConsultantType::Staff, 38_000.0),
            record(EmployeeId::new(), acme, oct, EmployeeStatus::Terminated, ConsultantType::Consultant, 50_000.0),
            record(EmployeeId::new(), acme, oct, EmployeeStatus::NonPayLeave, ConsultantType::Consultant, 0.0),
            record(EmployeeId::new(), acme, oct, EmployeeStatus::Preboarding, ConsultantType::Consultant, 0.0),
        ];

        let aggregator = ConsultantPoolAggregator::from_records(&records);
        let snapshot = aggregator.point_in_time(acme, oct);
        assert_eq!(snapshot.active_consultants, 2.0);
        assert!((snapshot.salary_sum - 85_000.0).abs() < 0.01);
    }

    #[test]
    fn test_duplicate_rows_count_once() {
        let acme = CompanyId::new();
        let employee = EmployeeId::new();
        let records = vec![
            record(employee, acme, date(2024, 10, 1), EmployeeStatus::Active, ConsultantType::Consultant, 40_000.0),
            record(employee, acme, date(2024, 10, 15), EmployeeStatus::Active, ConsultantType::Consultant, 40_000.0),
        ];
        let snapshot = ConsultantPoolAggregator::from_records(&records).point_in_time(acme, date(2024, 10, 1));
        assert_eq!(snapshot.active_consultants, 1.0);
        assert!((snapshot.salary_sum - 40_000.0).abs() < 0.01);
    }

    #[test]
    fn test_missing_month_is_empty_pool() {
        let aggregator = ConsultantPoolAggregator::default();
        assert_eq!(
            aggregator.point_in_time(CompanyId::new(), date(2024, 1, 1)),
            ConsultantPoolSnapshot::default()
        );
    }

    #[test]
    fn test_period_average_is_distinct_from_point_in_time() {
        let acme = CompanyId::new();
        let mut records = Vec::new();
        // Aug: 1, Sep: 2, Oct: 6 consultants.
        for (month, count) in [(8, 1), (9, 2), (10, 6)] {
            for _ in 0..count {
                records.push(record(
                    EmployeeId::new(),
                    acme,
                    date(2024, month, 1),
                    EmployeeStatus::Active,
                    ConsultantType::Consultant,
                    10_000.0,
                ));
            }
        }
        let aggregator = ConsultantPoolAggregator::from_records(&records);
        let oct = date(2024, 10, 1);

        let point = aggregator.snapshot(acme, oct, HeadcountMode::PointInTime);
        let average = aggregator.snapshot(acme, oct, HeadcountMode::PeriodAverage { months: 3 });

        assert_eq!(point.active_consultants, 6.0);
        assert!((average.active_consultants - 3.0).abs() < 1e-9);
        assert!((average.salary_sum - point.salary_sum).abs() < 0.01);
    }

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl SnapshotSource for CountingSource {
        fn snapshot(&self, _: CompanyId, _: NaiveDate, _: HeadcountMode) -> ConsultantPoolSnapshot {
            self.calls.set(self.calls.get() + 1);
            ConsultantPoolSnapshot {
                active_consultants: 1.0,
                salary_sum: 0.0,
            }
        }
    }

    #[test]
    fn test_table_evaluates_each_company_month_once() {
        let source = CountingSource { calls: Cell::new(0) };
        let acme = CompanyId::new();
        let globex = CompanyId::new();
        let period = MonthPeriod::new(date(2024, 1, 1), date(2024, 7, 1));

        // The duplicate company must not trigger a second evaluation.
        let table = SnapshotTable::build(&source, &[acme, globex, acme], &period, HeadcountMode::PointInTime);

        assert_eq!(source.calls.get(), 12);
        assert_eq!(table.len(), 12);
        for _ in 0..10 {
            table.get(acme, date(2024, 3, 1));
        }
        assert_eq!(source.calls.get(), 12);
    }
}
