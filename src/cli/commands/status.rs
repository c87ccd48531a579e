//! Status command implementation
//!
//! This module implements the `status` command for displaying the
//! per-status breakdown of a record set.

use crate::cli::records::read_record_set;
use crate::domain::{PatientStatus, StatusPartition};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Record set to inspect (JSON array of records)
    #[arg(short, long)]
    pub input: String,

    /// Also list the keys of records in a failure state
    #[arg(long)]
    pub show_failed: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input, "Checking record set status");

        let records = match read_record_set(&self.input) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to read record set");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("📊 Record Set Status: {}", self.input);
        println!();

        if records.is_empty() {
            println!("Record set is empty.");
            return Ok(0);
        }

        println!("{:<16} {:<16} {:>8}", "Status", "Next Step", "Count");
        println!("{}", "-".repeat(42));

        for (status, count) in records.status_counts() {
            if count == 0 {
                continue;
            }
            println!(
                "{:<16} {:<16} {:>8}",
                status.as_str(),
                next_step(status),
                count
            );
        }
        println!("{}", "-".repeat(42));
        println!("{:<33} {:>8}", "Total", records.len());
        println!();

        if self.show_failed {
            let failed = records.keys_where(|r| r.status().is_failure());
            if !failed.is_empty() {
                println!("Records in a failure state:");
                for key in failed {
                    if let Some(record) = records.get(&key) {
                        println!("  {key} ({})", record.status());
                    }
                }
                println!();
            }
        }

        Ok(0)
    }
}

fn next_step(status: PatientStatus) -> &'static str {
    match status.partition() {
        StatusPartition::ToCreate => "submit",
        StatusPartition::ToResolve => "resolve",
        StatusPartition::Pseudonymized => "send mdat",
        StatusPartition::Synced => "-",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_next_step() {
        assert_eq!(next_step(PatientStatus::Created), "submit");
        assert_eq!(next_step(PatientStatus::IdatConflict), "resolve");
        assert_eq!(next_step(PatientStatus::Pseudonymized), "send mdat");
        assert_eq!(next_step(PatientStatus::Processed), "-");
    }

    #[tokio::test]
    async fn test_status_of_record_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"key": "row-1", "idat": {"firstname": "Erika", "lastname": "Mustermann", "birthdate": "1964-08-12"}}]"#,
        )
        .unwrap();
        file.flush().unwrap();

        let args = StatusArgs {
            input: file.path().to_string_lossy().to_string(),
            show_failed: true,
        };
        assert_eq!(args.execute().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_status_of_missing_file() {
        let args = StatusArgs {
            input: "/nonexistent/records.json".to_string(),
            show_failed: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
    }
}
