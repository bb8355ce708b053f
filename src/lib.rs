//! Fleet-maintenance repair tickets kept in three flat CSV files.

pub mod auth;
pub mod bulk;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod query;
pub mod seed;
pub mod store;
#[doc(hidden)]
pub mod test_support;
pub mod trend;
