use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the repair store and its persistence layer.
///
/// None of these leave the in-memory tables half-updated: operations
/// validate before they mutate, and load failures fall back to seed data.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("couldn't read {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("couldn't save {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("grid row {row_id} was staged from ticket #{ticket_id} ({unit}) but the table has changed since; export the grid again")]
    StaleGrid {
        row_id: usize,
        ticket_id: i64,
        unit: String,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("ticket #{ticket_id} has {} rows with alert '{alert}' (rows {}); address one by row id", rows.len(), join_ids(rows))]
    Ambiguous {
        ticket_id: i64,
        alert: String,
        rows: Vec<usize>,
    },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("incorrect password for '{0}'")]
    BadPassword(String),

    #[error("stored password hash for '{user}' is unusable: {reason}")]
    BadHash { user: String, reason: String },

    #[error("session for '{0}' has expired; sign in again")]
    Expired(String),
}

fn join_ids(rows: &[usize]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type StoreResult<T> = Result<T, StoreError>;
