//! Flat renderings of allocation reports for downstream consumers.

use crate::chart_of_accounts::ChartOfAccounts;
use crate::error::Result;
use crate::report::{CategoryTotalsReport, LedgerReport, ReportGranularity};
use crate::utils::format_month;
use serde::Serialize;
use std::io::Write;

pub fn to_json<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// One row per month, category and account.
pub fn ledger_report_to_csv<W: Write>(
    report: &LedgerReport,
    chart: &ChartOfAccounts,
    writer: W,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Month",
        "Category",
        "Account Code",
        "Account Name",
        "Company",
        "Raw Sum",
        "Lump Sum",
        "Loan",
        "Debt",
    ])?;

    for (month, categories) in &report.months {
        for category in categories {
            for line in &category.lines {
                csv.write_record([
                    format_month(*month),
                    category.category.clone(),
                    line.account_code.to_string(),
                    line.name.clone(),
                    chart.company_name(line.company),
                    format!("{:.2}", line.raw_sum),
                    format!("{:.2}", line.lump_sum),
                    format!("{:.2}", line.loan),
                    format!("{:.2}", line.debt),
                ])?;
            }
        }
    }

    csv.flush()?;
    Ok(())
}

pub fn category_totals_to_csv<W: Write>(report: &CategoryTotalsReport, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Period",
        "Category",
        "Primary Sum",
        "Secondary Sum",
        "Adjusted Primary Sum",
        "Adjusted Secondary Sum",
    ])?;

    for (bucket, totals) in &report.periods {
        for total in totals {
            csv.write_record([
                format_month(*bucket),
                total.category.clone(),
                format!("{:.2}", total.primary_sum),
                format!("{:.2}", total.secondary_sum),
                format!("{:.2}", total.adjusted_primary_sum),
                format!("{:.2}", total.adjusted_secondary_sum),
            ])?;
        }
    }

    csv.flush()?;
    Ok(())
}

pub fn category_totals_to_markdown(report: &CategoryTotalsReport, chart: &ChartOfAccounts) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Allocation - {}\n\n",
        chart.company_name(report.primary)
    ));
    output.push_str(&format!(
        "**Period:** {} to {} (exclusive)\n\n",
        report.from, report.to
    ));

    for (bucket, totals) in &report.periods {
        if report.granularity == ReportGranularity::Monthly {
            output.push_str(&format!("## {}\n\n", format_month(*bucket)));
        }
        output.push_str("| Category | Primary | Secondary | Adjusted Primary | Adjusted Secondary |\n");
        output.push_str("|---|---:|---:|---:|---:|\n");
        for total in totals {
            output.push_str(&format!(
                "| {} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
                total.category,
                total.primary_sum,
                total.secondary_sum,
                total.adjusted_primary_sum,
                total.adjusted_secondary_sum
            ));
        }
        output.push('\n');
    }

    output
}
