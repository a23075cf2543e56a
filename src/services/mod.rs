// src/services/mod.rs

//! Source clients and the brand directory resolver.
//!
//! One client per provider family, all speaking the same contract: a fetch
//! for a target source either yields a [`PriceReading`] stamped with that
//! source's identity or a [`FetchError`](crate::error::FetchError) naming it.
//! Callers reduce every failure to "source unavailable"; nothing here
//! escalates.

pub mod directory;

mod brand;
mod page;
mod spot;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::{FetchResult, Result};
use crate::models::{EngineConfig, Family, PriceReading, Source};
use crate::utils::http;

pub use brand::BrandClient;
pub use directory::DirectoryResolver;
pub use page::PageClient;
pub use spot::SpotClient;

/// Uniform contract for one provider family.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetch a reading for `target`. The target is the identity stamped on
    /// the reading; the aggregation store decides how the result affects the
    /// selected view.
    async fn fetch(&self, target: Source) -> FetchResult<PriceReading>;
}

/// All three family clients plus the family → client dispatch.
pub struct SourceClients {
    spot: SpotClient,
    page: PageClient,
    brand: BrandClient,
}

impl SourceClients {
    /// Build every client from the configuration. Fails only on invalid
    /// pattern rules or an unbuildable HTTP client.
    pub fn new(config: &EngineConfig, directory: Arc<DirectoryResolver>) -> Result<Self> {
        let api_client = http::create_client(&config.http)?;
        let browser_client = http::create_browser_client(&config.http)?;

        Ok(Self {
            spot: SpotClient::new(api_client.clone(), config.providers.spot.clone()),
            page: PageClient::new(
                browser_client,
                config.providers.quote_page.clone(),
                config.providers.exchange.clone(),
            )?,
            brand: BrandClient::new(api_client, config.providers.brands.clone(), directory),
        })
    }

    /// Dispatch a fetch to the client owning the target's family.
    pub async fn fetch(&self, target: Source) -> FetchResult<PriceReading> {
        let client: &dyn SourceClient = match target.family() {
            Family::DirectApi => &self.spot,
            Family::ScrapedPage => &self.page,
            Family::BrandRouted => &self.brand,
        };
        client.fetch(target).await
    }

    /// Fetch every source once, concurrently but bounded, and return the
    /// outcomes in completion order.
    pub async fn fetch_all(&self, concurrency: usize) -> Vec<FetchResult<PriceReading>> {
        stream::iter(Source::ALL)
            .map(|source| self.fetch(source))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }

    /// The scraped-page client, for callers that want the raw exchange rows.
    pub fn page(&self) -> &PageClient {
        &self.page
    }
}
