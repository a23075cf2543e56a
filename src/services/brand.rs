// src/services/brand.rs

//! Brand-routed client.
//!
//! Resolves the source's brand keyword through the directory, builds the
//! parameterized quote URL from the brand id and extracts the price from the
//! JSON response. An empty directory triggers exactly one refresh before the
//! resolve is retried.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{FetchError, FetchResult};
use crate::extract;
use crate::models::{Brand, BrandProvider, PriceReading, Source};

use super::directory::DirectoryResolver;
use super::SourceClient;

/// Client for brand-keyed quote endpoints.
pub struct BrandClient {
    client: Client,
    provider: BrandProvider,
    directory: Arc<DirectoryResolver>,
}

impl BrandClient {
    pub fn new(client: Client, provider: BrandProvider, directory: Arc<DirectoryResolver>) -> Self {
        Self {
            client,
            provider,
            directory,
        }
    }

    /// Resolve the target's keyword, refreshing the directory once when the
    /// cache is empty.
    async fn resolve_brand(&self, target: Source) -> FetchResult<Brand> {
        let keyword = target
            .brand_keyword()
            .ok_or_else(|| FetchError::routing(target, "source has no brand keyword"))?;

        if let Some(brand) = self.directory.resolve(keyword).await {
            return Ok(brand);
        }

        if self.directory.is_empty().await {
            self.directory
                .refresh()
                .await
                .map_err(|e| FetchError::routing(target, format!("directory refresh: {e}")))?;
            if let Some(brand) = self.directory.resolve(keyword).await {
                return Ok(brand);
            }
        }

        Err(FetchError::routing(
            target,
            format!("'{keyword}' not found in brand directory"),
        ))
    }
}

#[async_trait]
impl SourceClient for BrandClient {
    async fn fetch(&self, target: Source) -> FetchResult<PriceReading> {
        let brand = self.resolve_brand(target).await?;

        let raw_url = self.provider.quote_url.replace("{id}", &brand.id);
        let url = url::Url::parse(&raw_url)
            .map_err(|e| FetchError::routing(target, format!("bad quote url: {e}")))?;

        let bytes = self
            .client
            .get(url)
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
                format!(
                    "no price for brand '{}' at path {}",
                    brand.name,
                    self.provider.json_path.join(".")
                ),
            )
        })?;

        Ok(PriceReading::now(target, price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serve `body` over plain HTTP from an ephemeral local port, counting
    /// the requests received.
    fn serve(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 2048];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (format!("http://{addr}/brands.js"), hits)
    }

    fn brand_client(directory_url: String) -> (BrandClient, Arc<DirectoryResolver>) {
        let client = Client::new();
        let directory = Arc::new(DirectoryResolver::new(client.clone(), directory_url));
        let provider = BrandProvider {
            quote_url: "http://127.0.0.1:9/brand?id={id}".into(),
            ..BrandProvider::default()
        };
        (
            BrandClient::new(client, provider, Arc::clone(&directory)),
            directory,
        )
    }

    #[tokio::test]
    async fn empty_cache_refreshes_directory_exactly_once() {
        // Directory holds one brand, and not the one being asked for.
        let (url, hits) = serve(r#"var b = [{"_id": "9f", "brand": "周生生"}];"#);
        let (client, directory) = brand_client(url);

        let error = client
            .fetch(Source::ChowTaiFook)
            .await
            .expect_err("keyword absent");
        assert!(matches!(error, FetchError::Routing { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!directory.is_empty().await);

        // Cache is now populated; another miss routes without re-fetching.
        let error = client
            .fetch(Source::LukFook)
            .await
            .expect_err("keyword absent");
        assert!(matches!(error, FetchError::Routing { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolved_brand_proceeds_to_quote_fetch() {
        let (url, hits) = serve(r#"[{"_id": "9f", "brand": "周生生旗舰店"}]"#);
        let (client, _directory) = brand_client(url);

        // The refresh resolves the keyword; the quote endpoint is a closed
        // port, so the attempt surfaces as a network failure, not routing.
        let error = client
            .fetch(Source::ChowSangSang)
            .await
            .expect_err("quote endpoint closed");
        assert!(matches!(error, FetchError::Network { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn seeded_cache_skips_the_refresh() {
        // Unreachable directory endpoint: any refresh attempt would fail.
        let (client, directory) = brand_client("http://127.0.0.1:9/brands.js".into());
        directory
            .replace(vec![Brand {
                id: "5a1b".into(),
                name: "周大福旗舰店".into(),
            }])
            .await;

        let error = client
            .fetch(Source::ChowTaiFook)
            .await
            .expect_err("quote endpoint closed");
        assert!(matches!(error, FetchError::Network { .. }));
    }

    #[tokio::test]
    async fn unreachable_directory_reports_routing() {
        let (client, _directory) = brand_client("http://127.0.0.1:9/brands.js".into());

        let error = client
            .fetch(Source::ChowTaiFook)
            .await
            .expect_err("directory unreachable");
        assert!(matches!(error, FetchError::Routing { .. }));
    }
}
