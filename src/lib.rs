//! tenki: JMA forecast normalization with a versioned snapshot history.

pub mod refresh;

pub use refresh::Refresher;
pub use tenki_core::{AppError, Config};
pub use tenki_forecast::{normalize, DailyForecasts, DayEntry, NormalizedDayRecord};
pub use tenki_store::{FetchedAt, ForecastSnapshot, SnapshotStore};
