use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use repair_tracker::store::{Store, TableKind};

/// Write a table's CSV, byte-for-byte what a save would put on disk.
pub fn run(store: &Store, kind: TableKind, output_path: Option<&Path>) -> Result<()> {
    let bytes = store.export(kind)?;

    match output_path {
        Some(path) => {
            fs::write(path, &bytes).context("Failed to write export file")?;
            eprintln!("Exported {} to {}", kind.as_str(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::setup_test_store;

    #[test]
    fn test_export_repairs_to_file() {
        let (store, dir) = setup_test_store();
        let path = dir.path().join("repairs_tracker.csv");
        run(&store, TableKind::Repairs, Some(&path)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Ticket ID,Unit #,YMM,Alert Type/Issue"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_export_matches_saved_file() {
        let (mut store, dir) = setup_test_store();
        store.add_alert_type("Glass").unwrap();
        let path = dir.path().join("alerts.csv");
        run(&store, TableKind::Alerts, Some(&path)).unwrap();

        assert_eq!(fs::read(&path).unwrap(), fs::read(&store.paths().alerts).unwrap());
    }

    #[test]
    fn test_export_trucks_stdout() {
        let (store, _dir) = setup_test_store();
        assert!(run(&store, TableKind::Trucks, None).is_ok());
    }
}
