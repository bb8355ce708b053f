use anyhow::{Context, Result};
use std::path::Path;

use repair_tracker::bulk::{BulkUpdate, EditGrid};
use repair_tracker::query::RepairFilter;
use repair_tracker::store::{CommitMode, Store};

use super::report_save;

pub fn export(store: &Store, filter: &RepairFilter, output: &Path) -> Result<()> {
    let view = filter.apply_indexed(store.repairs());
    let grid = EditGrid::stage_view(&view);
    grid.write_csv(output)
        .with_context(|| format!("Failed to write grid to {}", output.display()))?;

    println!("Wrote {} row(s) to {}", grid.rows.len(), output.display());
    println!("Edit the file, mark rows in the Select column if needed, then run `grid commit`.");
    Ok(())
}

pub fn commit(
    store: &mut Store,
    file: &Path,
    selected: bool,
    extra_rows: Vec<usize>,
    bulk: BulkUpdate,
) -> Result<()> {
    let grid = EditGrid::read_csv(file)
        .with_context(|| format!("Failed to read grid from {}", file.display()))?;

    let mode = if selected {
        CommitMode::Selection {
            extra: extra_rows,
            bulk,
        }
    } else {
        if !bulk.is_empty() || !extra_rows.is_empty() {
            eprintln!("Warning: bulk options and --row only apply with --selected; ignoring them.");
        }
        CommitMode::ChangedRows
    };

    let (rows, report) = store.commit_grid(&grid, mode)?;
    match report {
        Some(report) => {
            report_save(&report);
            println!("Updated {} row(s)", rows.len());
        }
        None => println!("No changes."),
    }
    Ok(())
}
