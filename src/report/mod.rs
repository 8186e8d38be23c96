use crate::state::{BuildStatus, ReconciliationTable};
use colored::Colorize;

/// One printed row per record: `org/repo#pr  STATUS  sha  job_id`.
fn rows(table: &ReconciliationTable) -> Vec<(String, BuildStatus, String, String)> {
    table
        .iter()
        .map(|(org, repo, pr, record)| {
            let sha: String = record.sha.chars().take(12).collect();
            (
                format!("{org}/{repo}#{pr}"),
                record.status,
                sha,
                record.job_id.clone(),
            )
        })
        .collect()
}

/// Print the reconciliation table to the terminal.
pub fn print_table(table: &ReconciliationTable) {
    if table.is_empty() {
        println!("No pull requests tracked.");
        return;
    }
    let rows = rows(table);
    let width = rows.iter().map(|(name, ..)| name.len()).max().unwrap_or(0);
    for (name, status, sha, job_id) in rows {
        println!("{name:<width$}  {:<8}  {sha}  {job_id}", colorize_status(status));
    }
}

fn colorize_status(status: BuildStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        BuildStatus::Pending => label.yellow().bold(),
        BuildStatus::Success => label.green().bold(),
        BuildStatus::Failure => label.red().bold(),
        BuildStatus::Stopped => label.dimmed(),
    }
}
