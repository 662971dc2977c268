//! HTTP client for the JMA forecast feed.

use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use tenki_core::{FeedConfig, FeedError, ReqwestErrorExt};

use crate::catalog::AreaCatalog;
use crate::normalize::RawForecastPayload;

#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Arc<Client>,
    config: FeedConfig,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            config: config.clone(),
        })
    }

    /// Fetch and parse the area catalog.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_area_catalog(&self) -> Result<AreaCatalog, FeedError> {
        let body = self.get_json(&self.config.area_url).await?;
        AreaCatalog::from_json(body)
            .map_err(|e| FeedError::InvalidResponse(format!("Area catalog: {}", e)))
    }

    /// Fetch the forecast documents for one area.
    ///
    /// The body must be a JSON array; its contents are left to the normalizer.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(&self, area_code: &str) -> Result<RawForecastPayload, FeedError> {
        let url = self.config.forecast_url_for(area_code);
        match self.get_json(&url).await? {
            Value::Array(documents) => {
                tracing::debug!("Forecast for {} has {} documents", area_code, documents.len());
                Ok(documents)
            }
            other => Err(FeedError::InvalidResponse(format!(
                "Expected a JSON array of forecast documents, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ReqwestErrorExt::into_feed_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FeedError::ServerError {
                status: status.as_u16(),
                message: text,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(ReqwestErrorExt::into_feed_error)?;

        serde_json::from_slice(&bytes)
            .map_err(|e| FeedError::InvalidResponse(format!("JSON parse error: {}", e)))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
