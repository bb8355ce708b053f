pub mod add;
pub mod alert;
pub mod bulk;
pub mod delete;
pub mod edit;
pub mod export;
pub mod grid;
pub mod init;
pub mod list;
pub mod show;
pub mod trend;
pub mod truck;
pub mod whoami;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::io::{self, Write};

use repair_tracker::models::{parse_date, PriorityTier, Status};
use repair_tracker::persistence::{SaveReport, Snapshot};

pub fn parse_priority(s: &str) -> Result<PriorityTier> {
    Ok(s.parse()?)
}

pub fn parse_status(s: &str) -> Result<Status> {
    Ok(s.parse()?)
}

pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    match parse_date(s) {
        Some(date) => Ok(date),
        None => bail!("Invalid date '{}'. Use MM/DD/YYYY", s),
    }
}

/// Tell the user about a backup that couldn't be taken. The save itself
/// already succeeded.
pub fn report_save(report: &SaveReport) {
    match &report.snapshot {
        Snapshot::Failed { path, reason } => {
            eprintln!(
                "Warning: saved {} but couldn't write backup {}: {}",
                report.path.display(),
                path.display(),
                reason
            );
        }
        Snapshot::Created(path) => {
            tracing::debug!(backup = %path.display(), "daily backup written");
        }
        Snapshot::AlreadyTaken(_) => {}
    }
}

pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use repair_tracker::auth::{AuthGate, Session};
    use repair_tracker::config::DataPaths;
    use repair_tracker::store::{Clock, Store};
    use repair_tracker::test_support::{settings, PASSWORD, USER};

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    pub fn session() -> Session {
        AuthGate::new(settings().unwrap())
            .login(USER, PASSWORD)
            .unwrap()
    }

    pub fn setup_test_store() -> (Store, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            Store::open(&session(), DataPaths::new(dir.path()), Clock::Fixed(today())).unwrap();
        (store, dir)
    }
}
