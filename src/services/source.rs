// src/services/source.rs

//! Open data API reader.
//!
//! Fetches pages of raw meter rows by offset and the dataset's reported row
//! count. Requests carry the app token in `X-App-Token`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{RawMeter, SourceConfig};
use crate::utils::http;

const APP_TOKEN_HEADER: &str = "X-App-Token";

/// Anything that can serve the meter dataset page by page.
#[async_trait]
pub trait MeterSource: Send + Sync {
    /// Fetch the page starting at `offset`. Past the end this is empty.
    async fn fetch_page(&self, offset: u64) -> Result<Vec<RawMeter>>;

    /// Fetch the number of rows the dataset reports.
    async fn fetch_total_count(&self) -> Result<u64>;
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: String,
}

/// HTTP client for the open data resource endpoint.
pub struct OpenDataClient {
    client: Client,
    base_url: Url,
    app_token: String,
    page_size: Option<u64>,
}

impl OpenDataClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        Self::with_client(client, config)
    }

    /// Create a client on top of an existing `reqwest::Client`.
    pub fn with_client(client: Client, config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
            app_token: config.app_token.clone(),
            page_size: config.page_size,
        })
    }

    fn page_url(&self, offset: u64) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("$offset", &offset.to_string());
            if let Some(limit) = self.page_size {
                query.append_pair("$limit", &limit.to_string());
            }
        }
        url
    }

    fn count_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("$select", "count(*)");
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, context: &str) -> Result<T> {
        log::debug!("GET {}", url);

        let mut request = self.client.get(url);
        if !self.app_token.is_empty() {
            request = request.header(APP_TOKEN_HEADER, &self.app_token);
        }

        let body = request.send().await?.error_for_status()?.text().await?;
        serde_json::from_str(&body).map_err(|e| AppError::decode(context, e))
    }
}

#[async_trait]
impl MeterSource for OpenDataClient {
    async fn fetch_page(&self, offset: u64) -> Result<Vec<RawMeter>> {
        let context = format!("page at offset {offset}");
        self.get_json(self.page_url(offset), &context).await
    }

    async fn fetch_total_count(&self) -> Result<u64> {
        let rows: Vec<CountRow> = self.get_json(self.count_url(), "row count").await?;
        let row = rows
            .first()
            .ok_or_else(|| AppError::decode("row count", "no count result returned"))?;
        row.count.trim().parse().map_err(|e| {
            AppError::decode("row count", format!("count '{}' is not an integer: {e}", row.count))
        })
    }
}
