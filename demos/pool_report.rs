use chrono::NaiveDate;
use pool_allocation_engine::*;

fn consultants(company: CompanyId, month: NaiveDate, count: usize, salary: f64) -> Vec<EmployeeMonth> {
    (0..count)
        .map(|_| EmployeeMonth {
            employee: EmployeeId::new(),
            company,
            month,
            status: EmployeeStatus::Active,
            consultant_type: ConsultantType::Consultant,
            salary,
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    println!("📊 Pool Allocation Demo\n");
    println!("Two sibling consultancies share premises and a pooled salary account.");
    println!("Shared costs are split by active consultant headcount each month.\n");

    let acme = Company::new("Acme Consulting ApS");
    let globex = Company::new("Globex Consulting ApS");

    let chart = ChartOfAccounts::new(
        vec![acme.clone(), globex.clone()],
        vec![
            AccountingCategory::new(
                "Salaries",
                vec![
                    AccountingAccount::new(acme.id, 3502, "Salaries, pooled").shared().salary(),
                    AccountingAccount::new(acme.id, 3500, "Payroll").salary(),
                    AccountingAccount::new(globex.id, 3500, "Payroll").salary(),
                ],
            ),
            AccountingCategory::new(
                "Premises",
                vec![
                    AccountingAccount::new(acme.id, 2210, "Rent").shared(),
                    AccountingAccount::new(globex.id, 2210, "Rent").shared(),
                ],
            ),
        ],
    );

    println!("{}", chart.to_markdown());
    println!("📄 Chart as CSV:\n{}", chart.to_csv()?);

    let config = AllocationConfig::for_months(acme.id, "2024-01:2024-02")?;
    let jan = config.from;
    let feb = next_month(jan);

    let mut entries = Vec::new();
    for month in [jan, feb] {
        entries.push(LedgerEntry { company: acme.id, account_code: 3502, date: month, amount: 80_000.0 });
        entries.push(LedgerEntry { company: acme.id, account_code: 3500, date: month, amount: 12_000.0 });
        entries.push(LedgerEntry { company: globex.id, account_code: 3500, date: month, amount: 90_000.0 });
        entries.push(LedgerEntry { company: acme.id, account_code: 2210, date: month, amount: 10_000.0 });
        entries.push(LedgerEntry { company: globex.id, account_code: 2210, date: month, amount: 4_000.0 });
    }

    let pooled = chart.find_category("Salaries")?.accounts.iter().find(|a| a.account_code == 3502);
    let corrections: Vec<LumpSumCorrection> = pooled
        .map(|account| LumpSumCorrection {
            account: account.id,
            month: jan,
            amount: 6_000.0,
            description: Some("Bonus paid outside the pool".to_string()),
        })
        .into_iter()
        .collect();

    let mut employees = Vec::new();
    for month in [jan, feb] {
        employees.extend(consultants(acme.id, month, 4, 5_000.0));
    }
    employees.extend(consultants(globex.id, jan, 2, 45_000.0));
    employees.extend(consultants(globex.id, feb, 4, 45_000.0));

    let inputs = AllocationInputs::new(chart, &entries, &corrections, &employees);

    println!("🔄 Ledger view (what Acme lends and is owed):\n");
    match process_ledger_report(&inputs, &config) {
        Ok(report) => {
            for (month, categories) in &report.months {
                println!("  {}", format_month(*month));
                for category in categories {
                    println!(
                        "    {:<10} loan {:>10.2}  debt {:>10.2}",
                        category.category, category.loan_total, category.debt_total
                    );
                }
            }
            println!("\n  Net balance: {:>10.2}\n", report.net_balance());

            let mut csv = Vec::new();
            export::ledger_report_to_csv(&report, &inputs.chart, &mut csv)?;
            println!("📄 CSV export:\n{}", String::from_utf8(csv)?);
        }
        Err(e) => println!("❌ Ledger report failed: {}", e),
    }

    println!("📈 Adjusted sums per month:\n");
    let totals = process_category_totals(&inputs, &config, ReportGranularity::Monthly)?;
    println!("{}", export::category_totals_to_markdown(&totals, &inputs.chart));

    let averaged = config.clone().with_headcount_mode(HeadcountMode::PeriodAverage { months: 2 });
    let summary = process_period_summary(&inputs, &averaged, "Premises")?;
    println!(
        "🏢 Premises with a two-month headcount average: raw {:.2}, kept {:.2}, lent {:.2}, owed {:.2}",
        summary.raw_sum, summary.total(), summary.loan_sum, summary.debt_sum
    );

    Ok(())
}
