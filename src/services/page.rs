// src/services/page.rs

//! Scraped-page client.
//!
//! Fetches HTML quote pages with a browser-like header set, decodes the body
//! with encoding fallback and extracts a price with the provider's pattern
//! rules: ordered single-value fallback for the quote page, multi-row mean
//! for the exchange table.

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::{AppError, FetchError, FetchResult, Result};
use crate::extract::{self, PatternRule, QuoteRow};
use crate::models::{ExchangeProvider, PageProvider, PriceReading, Source};

use super::SourceClient;

/// Client for scraped single-value and multi-row quote pages.
pub struct PageClient {
    client: Client,
    quote_page: PageProvider,
    exchange: ExchangeProvider,
    rules: Vec<PatternRule>,
    row_rule: Regex,
}

impl PageClient {
    /// Build a page client, compiling the provider's pattern rules.
    pub fn new(client: Client, quote_page: PageProvider, exchange: ExchangeProvider) -> Result<Self> {
        let rules = PatternRule::compile_all(&quote_page.rules)?;
        let row_rule = Regex::new(&exchange.row_pattern)
            .map_err(|e| AppError::pattern(&exchange.row_pattern, e))?;
        Ok(Self {
            client,
            quote_page,
            exchange,
            rules,
            row_rule,
        })
    }

    /// GET a page and decode its body, honoring a declared charset first.
    async fn fetch_text(&self, target: Source, url: &str) -> FetchResult<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| FetchError::network(target, e))?;

        let declared = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|ct| ct.split("charset=").nth(1))
            .map(|label| label.trim_matches(|c: char| c == '"' || c.is_whitespace()).to_string());

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::network(target, e))?;

        extract::decode_text(&bytes, declared.as_deref())
            .ok_or_else(|| FetchError::decode(target, "no candidate encoding decoded cleanly"))
    }

    /// Fetch the exchange table and return every matched row with the
    /// rounded mean. The rows are part of the result, not discarded.
    pub async fn fetch_exchange_rows(
        &self,
        target: Source,
    ) -> FetchResult<(Vec<QuoteRow>, f64)> {
        let text = self.fetch_text(target, &self.exchange.url).await?;
        let rows = extract::extract_rows(&text, &self.row_rule);
        let mean = extract::mean_price(&rows)
            .ok_or_else(|| FetchError::miss(target, "no quote rows matched"))?;
        Ok((rows, mean))
    }

    async fn fetch_quote_page(&self, target: Source) -> FetchResult<PriceReading> {
        let text = self.fetch_text(target, &self.quote_page.url).await?;
        let price = extract::first_price(&text, &self.rules)
            .ok_or_else(|| FetchError::miss(target, "no pattern rule matched"))?;
        Ok(PriceReading::now(target, price))
    }
}

#[async_trait]
impl SourceClient for PageClient {
    async fn fetch(&self, target: Source) -> FetchResult<PriceReading> {
        match target {
            Source::ExchangeTable => {
                let (rows, mean) = self.fetch_exchange_rows(target).await?;
                log::debug!("{target}: {} quote rows, mean {mean:.2}", rows.len());
                Ok(PriceReading::now(target, mean))
            }
            _ => self.fetch_quote_page(target).await,
        }
    }
}
