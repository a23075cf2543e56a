// src/services/directory.rs

//! Brand directory resolver.
//!
//! The brand-routed sources need an upstream identifier before they can ask
//! for a quote. The mapping from store name to identifier lives in one
//! externally-hosted script/JSON document; this service fetches it, parses
//! the `{"_id": …, "brand": …}` fragments structurally and caches the result
//! until the next explicit refresh.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::extract;
use crate::models::Brand;

/// Structural match for one brand record. The document is not parsed as a
/// whole: it is a script file whose surrounding syntax changes, but the
/// record fragments have kept this shape.
fn brand_fragment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\s*"_id"\s*:\s*"([^"]+)"\s*,\s*"brand"\s*:\s*"([^"]+)"\s*\}"#)
            .expect("brand fragment pattern is valid")
    })
}

/// Parse all well-formed brand fragments out of the directory document.
/// Malformed fragments are skipped, not fatal.
pub fn parse_brands(text: &str) -> Vec<Brand> {
    brand_fragment()
        .captures_iter(text)
        .map(|captures| Brand {
            id: captures[1].to_string(),
            name: captures[2].to_string(),
        })
        .collect()
}

/// First directory entry whose name contains the keyword as a substring.
/// Absence is a normal "not found" outcome.
pub fn resolve_in<'a>(keyword: &str, directory: &'a [Brand]) -> Option<&'a Brand> {
    directory.iter().find(|brand| brand.name.contains(keyword))
}

/// Fetches and caches the brand directory.
pub struct DirectoryResolver {
    client: Client,
    url: String,
    cache: RwLock<Vec<Brand>>,
}

impl DirectoryResolver {
    /// Create a resolver with an empty cache.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            cache: RwLock::new(Vec::new()),
        }
    }

    /// Fetch the directory document and replace the cache wholesale.
    /// Returns the number of brands parsed.
    pub async fn refresh(&self) -> Result<usize> {
        let bytes = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let text = extract::decode_text(&bytes, None)
            .ok_or_else(|| AppError::decode("brand directory body not decodable under any encoding"))?;
        let brands = parse_brands(&text);
        log::info!("Brand directory refreshed: {} entries", brands.len());

        self.replace(brands.clone()).await;
        Ok(brands.len())
    }

    /// Replace the cached directory.
    pub async fn replace(&self, brands: Vec<Brand>) {
        *self.cache.write().await = brands;
    }

    /// Whether the cache currently holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Snapshot of the cached directory.
    pub async fn brands(&self) -> Vec<Brand> {
        self.cache.read().await.clone()
    }

    /// Resolve a keyword against the cached directory.
    pub async fn resolve(&self, keyword: &str) -> Option<Brand> {
        resolve_in(keyword, &self.cache.read().await).cloned()
    }

    /// Fetch the directory once if the cache is empty.
    pub async fn ensure_loaded(&self) -> Result<()> {
        if self.is_empty().await {
            self.refresh().await?;
        }
        Ok(())
    }
}
