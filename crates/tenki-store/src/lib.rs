//! SQLite snapshot history for normalized forecasts.
//!
//! Every fetch is appended as its own batch stamped with `fetched_at`, so
//! older forecasts stay queryable after newer ones arrive.

pub mod catalog;
pub mod store;

pub use store::{parse_fetched_at, FetchedAt, ForecastSnapshot, SnapshotStore, FETCHED_AT_FORMAT};
