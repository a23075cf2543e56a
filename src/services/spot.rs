// src/services/spot.rs

//! Direct-API client: one GET against the fixed JSON spot-price endpoint.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{FetchError, FetchResult};
use crate::extract;
use crate::models::{PriceReading, Source, SpotProvider};

use super::SourceClient;

/// Client for the structured JSON spot-price API.
pub struct SpotClient {
    client: Client,
    provider: SpotProvider,
}

impl SpotClient {
    pub fn new(client: Client, provider: SpotProvider) -> Self {
        Self { client, provider }
    }
}

#[async_trait]
impl SourceClient for SpotClient {
    async fn fetch(&self, target: Source) -> FetchResult<PriceReading> {
        let bytes = self
            .client
            .get(&self.provider.url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| FetchError::network(target, e))?
            .bytes()
            .await
            .map_err(|e| FetchError::network(target, e))?;

        let price = extract::nested_price(&bytes, &self.provider.json_path).ok_or_else(|| {
            FetchError::miss(
                target,
                format!("no price at path {}", self.provider.json_path.join(".")),
            )
        })?;

        Ok(PriceReading::now(target, price))
    }
}
