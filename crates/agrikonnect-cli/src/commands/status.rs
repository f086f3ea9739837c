//! Status command

use agrikonnect_core::config::MigrateConfig;
use agrikonnect_core::model::StatusReport;
use clap::Args;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: StatusArgs, config: &MigrateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let migrator = super::migrator(config)?;
    let conn = super::open_for_read(config)?;
    let report = migrator.status(&conn)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_table(&report));
    }

    Ok(())
}

fn render_table(report: &StatusReport) -> String {
    let width = report
        .rows
        .iter()
        .map(|r| r.filename.len())
        .chain(std::iter::once("Migration".len()))
        .max()
        .unwrap_or_default();

    let mut out = format!("{:<width$}  {:<8}  {}\n", "Migration", "Executed", "Executed at");
    for row in &report.rows {
        let executed = match (row.is_executed(), row.modified) {
            (true, true) => "yes*",
            (true, false) => "yes",
            (false, _) => "no",
        };
        let at = row
            .executed_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        out.push_str(&format!("{:<width$}  {:<8}  {}\n", row.filename, executed, at));
    }

    if report.modified().next().is_some() {
        out.push_str("\n* modified since it was executed\n");
    }

    if !report.orphaned.is_empty() {
        out.push_str("\nApplied but missing on disk:\n");
        for entry in &report.orphaned {
            out.push_str(&format!("  {} (version {})\n", entry.filename, entry.version));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrikonnect_core::model::{LedgerEntry, MigrationState, StatusRow, Version};
    use chrono::{TimeZone, Utc};

    fn row(version: u64, name: &str, applied: bool, modified: bool) -> StatusRow {
        StatusRow {
            version: Version::new(version),
            filename: name.to_string(),
            description: String::new(),
            state: if applied {
                MigrationState::Applied
            } else {
                MigrationState::Pending
            },
            executed_at: applied.then(|| Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()),
            modified,
        }
    }

    #[test]
    fn test_render_table() {
        let report = StatusReport {
            rows: vec![
                row(1, "V1__init.sql", true, false),
                row(2, "V2__seed_products.sql", true, true),
                row(3, "V3__orders.sql", false, false),
            ],
            orphaned: vec![LedgerEntry {
                version: Version::new(0),
                filename: "V0__legacy.sql".to_string(),
                checksum: "abc".to_string(),
                executed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            }],
        };

        let table = render_table(&report);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(
            lines[0].split_whitespace().collect::<Vec<_>>(),
            vec!["Migration", "Executed", "Executed", "at"]
        );
        assert!(lines[1].starts_with("V1__init.sql"));
        assert!(lines[1].contains("yes "));
        assert!(lines[1].ends_with("2024-05-01 08:30:00"));
        assert!(lines[2].contains("yes*"));
        assert!(lines[3].contains("no"));
        assert!(table.contains("* modified since it was executed"));
        assert!(table.contains("V0__legacy.sql (version 0)"));
    }
}
