//! Forecast feed handling for tenki
//!
//! Fetches JMA area catalogs and forecast documents, and normalizes the
//! two-document forecast payload into one record per date.

pub mod catalog;
pub mod feed;
pub mod normalize;
pub mod types;

pub use catalog::{Area, AreaCatalog, AreaType, CenterNode, RegionIndex};
pub use feed::FeedClient;
pub use normalize::{normalize, RawForecastPayload};
pub use types::*;
