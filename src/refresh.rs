//! Fetch → normalize → store.
//!
//! Store calls run on the blocking pool, and the feed request finishes
//! before any database connection is opened. A failed fetch never reaches
//! the store.

use std::time::Duration;

use tenki_core::{AppError, Config, StorageError};
use tenki_forecast::{normalize, DayEntry, FeedClient, RegionIndex};
use tenki_store::{FetchedAt, ForecastSnapshot, SnapshotStore};

#[derive(Debug, Clone)]
pub struct Refresher {
    feed: FeedClient,
    store: SnapshotStore,
}

impl Refresher {
    pub fn new(feed: FeedClient, store: SnapshotStore) -> Self {
        Self { feed, store }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let feed = FeedClient::new(&config.feed)?;
        let store = SnapshotStore::open_with_timeout(
            config.database_path(),
            Duration::from_millis(config.store.busy_timeout_ms),
        )?;
        Ok(Self::new(feed, store))
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Download the area catalog, persist it and return the center → offices index.
    pub async fn refresh_catalog(&self) -> Result<RegionIndex, AppError> {
        let catalog = self.feed.fetch_area_catalog().await?;
        let index = catalog.index();

        self.with_store(move |store| store.replace_catalog(&catalog))
            .await?;

        tracing::info!(
            "Catalog refreshed: {} centers, {} offices",
            index.centers.len(),
            index.office_count()
        );
        Ok(index)
    }

    /// Download one area's forecast and append it as a new snapshot.
    ///
    /// The area name comes from the stored catalog, falling back to the code.
    pub async fn refresh_area(&self, area_code: &str) -> Result<ForecastSnapshot, AppError> {
        let payload = self.feed.fetch_forecast(area_code).await?;
        let days = normalize(&payload);
        tracing::debug!("Normalized {} days for {}", days.len(), area_code);

        let code = area_code.to_string();
        let (area_name, fetched_at, days) = self
            .with_store(move |store| {
                let area_name = store
                    .area(&code)?
                    .map(|area| area.area_name)
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| code.clone());
                let fetched_at = store.write_snapshot(&code, &area_name, &days)?;
                Ok((area_name, fetched_at, days))
            })
            .await?;

        tracing::info!(
            "Refreshed {} at {} ({} days)",
            area_code,
            fetched_at,
            days.len()
        );

        Ok(ForecastSnapshot {
            area_code: area_code.to_string(),
            area_name,
            fetched_at,
            days: days
                .into_iter()
                .map(|(date, record)| DayEntry { date, record })
                .collect(),
        })
    }

    pub async fn latest(&self, area_code: &str) -> Result<Vec<DayEntry>, AppError> {
        let code = area_code.to_string();
        self.with_store(move |store| store.latest_snapshot(&code))
            .await
    }

    pub async fn snapshot_at(
        &self,
        area_code: &str,
        fetched_at: FetchedAt,
    ) -> Result<Option<ForecastSnapshot>, AppError> {
        let code = area_code.to_string();
        self.with_store(move |store| store.load_snapshot(&code, &fetched_at))
            .await
    }

    pub async fn history(&self, area_code: &str) -> Result<Vec<FetchedAt>, AppError> {
        let code = area_code.to_string();
        self.with_store(move |store| store.fetch_history(&code))
            .await
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&SnapshotStore) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| AppError::Other(anyhow::anyhow!("Store task failed: {}", e)))?
            .map_err(AppError::from)
    }
}
