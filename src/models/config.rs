// src/models/config.rs

//! Engine configuration structures.
//!
//! Upstream endpoints and scraped-page pattern rules live here rather than in
//! code: every upstream is schema-unstable, so rules are data that can be
//! overridden from a TOML file without recompiling.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Refresh tier intervals
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Upstream endpoints and extraction rules
    #[serde(default)]
    pub providers: ProviderConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.schedule.fast_interval_ms == 0 {
            return Err(AppError::validation("schedule.fast_interval_ms must be > 0"));
        }
        if self.schedule.page_interval_secs == 0 {
            return Err(AppError::validation(
                "schedule.page_interval_secs must be > 0",
            ));
        }
        if self.schedule.brand_interval_secs == 0 {
            return Err(AppError::validation(
                "schedule.brand_interval_secs must be > 0",
            ));
        }
        if self.providers.spot.json_path.is_empty() {
            return Err(AppError::validation("providers.spot.json_path is empty"));
        }
        if self.providers.quote_page.rules.is_empty() {
            return Err(AppError::validation("providers.quote_page.rules is empty"));
        }
        for rule in &self.providers.quote_page.rules {
            regex::Regex::new(&rule.pattern)
                .map_err(|e| AppError::pattern(&rule.pattern, e))?;
        }
        regex::Regex::new(&self.providers.exchange.row_pattern)
            .map_err(|e| AppError::pattern(&self.providers.exchange.row_pattern, e))?;
        if !self.providers.brands.quote_url.contains("{id}") {
            return Err(AppError::validation(
                "providers.brands.quote_url must contain an {id} placeholder",
            ));
        }
        Ok(())
    }
}

/// HTTP client settings.
///
/// The default User-Agent is a realistic browser string: several of the
/// scraped upstreams reject obvious non-browser clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for all requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Refresh tier intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Tick period and fast-tier interval, in milliseconds
    #[serde(default = "defaults::fast_interval_ms")]
    pub fast_interval_ms: u64,

    /// Scraped-page tier interval, in seconds
    #[serde(default = "defaults::slow_interval")]
    pub page_interval_secs: u64,

    /// Brand tier interval, in seconds
    #[serde(default = "defaults::slow_interval")]
    pub brand_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fast_interval_ms: defaults::fast_interval_ms(),
            page_interval_secs: defaults::slow_interval(),
            brand_interval_secs: defaults::slow_interval(),
        }
    }
}

/// Upstream endpoints and extraction rules, per provider family.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    /// Direct JSON spot-price API
    #[serde(default)]
    pub spot: SpotProvider,

    /// Scraped single-value quote page
    #[serde(default)]
    pub quote_page: PageProvider,

    /// Scraped multi-row exchange quote table
    #[serde(default)]
    pub exchange: ExchangeProvider,

    /// Brand directory and brand quote endpoint
    #[serde(default)]
    pub brands: BrandProvider,
}

/// Fixed-URL JSON endpoint with a nested numeric-string price field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotProvider {
    #[serde(default = "defaults::spot_url")]
    pub url: String,

    /// Object keys walked to reach the price field
    #[serde(default = "defaults::spot_json_path")]
    pub json_path: Vec<String>,
}

impl Default for SpotProvider {
    fn default() -> Self {
        Self {
            url: defaults::spot_url(),
            json_path: defaults::spot_json_path(),
        }
    }
}

/// Scraped page with an ordered list of fallback pattern rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageProvider {
    #[serde(default = "defaults::quote_page_url")]
    pub url: String,

    /// Rules tried in order; first plausible capture wins
    #[serde(default = "defaults::quote_page_rules")]
    pub rules: Vec<PatternRuleConfig>,
}

impl Default for PageProvider {
    fn default() -> Self {
        Self {
            url: defaults::quote_page_url(),
            rules: defaults::quote_page_rules(),
        }
    }
}

/// Scraped page carrying several market quote rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeProvider {
    #[serde(default = "defaults::exchange_url")]
    pub url: String,

    /// Pattern with three captures: label, price, quote time
    #[serde(default = "defaults::exchange_row_pattern")]
    pub row_pattern: String,
}

impl Default for ExchangeProvider {
    fn default() -> Self {
        Self {
            url: defaults::exchange_url(),
            row_pattern: defaults::exchange_row_pattern(),
        }
    }
}

/// Brand directory document and the parameterized quote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandProvider {
    /// Script/JSON document listing `{"_id": …, "brand": …}` records
    #[serde(default = "defaults::directory_url")]
    pub directory_url: String,

    /// Quote endpoint; `{id}` is replaced with the resolved brand id
    #[serde(default = "defaults::brand_quote_url")]
    pub quote_url: String,

    /// Object keys walked to reach the price field in a quote response
    #[serde(default = "defaults::brand_json_path")]
    pub json_path: Vec<String>,
}

impl Default for BrandProvider {
    fn default() -> Self {
        Self {
            directory_url: defaults::directory_url(),
            quote_url: defaults::brand_quote_url(),
            json_path: defaults::brand_json_path(),
        }
    }
}

/// One scraped-extraction pattern rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRuleConfig {
    /// Regex with a single numeric capture group
    pub pattern: String,

    /// Lowest plausible captured price
    #[serde(default)]
    pub min: Option<f64>,

    /// Highest plausible captured price
    #[serde(default)]
    pub max: Option<f64>,
}

mod defaults {
    use super::PatternRuleConfig;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        15
    }

    // Schedule defaults
    pub fn fast_interval_ms() -> u64 {
        1000
    }
    pub fn slow_interval() -> u64 {
        300
    }

    // Spot API defaults
    pub fn spot_url() -> String {
        "https://api.jdjygold.com/gw/generic/hj/h5/m/latestPrice".into()
    }
    pub fn spot_json_path() -> Vec<String> {
        vec!["resultData".into(), "datas".into(), "price".into()]
    }

    // Quote page defaults. Rules are deliberately redundant: the page markup
    // changes without notice, so several phrasings of the same displayed
    // value are tried in order. Prices are CNY per gram, three digits.
    pub fn quote_page_url() -> String {
        "https://www.huangjinjiage.cn/gold/today.html".into()
    }
    pub fn quote_page_rules() -> Vec<PatternRuleConfig> {
        let bounded = |pattern: &str| PatternRuleConfig {
            pattern: pattern.into(),
            min: Some(100.0),
            max: Some(999.99),
        };
        vec![
            bounded(r"今日金价[：:]\s*([0-9]{3}(?:\.[0-9]+)?)\s*元"),
            bounded(r"黄金价格[：:]\s*([0-9]+(?:\.[0-9]+)?)"),
            bounded(r#"id="todayPrice"[^>]*>\s*([0-9]+(?:\.[0-9]+)?)"#),
            bounded(r#"class="gold-price[^"]*"[^>]*>\s*￥?\s*([0-9]+(?:\.[0-9]+)?)"#),
            bounded(r"([0-9]+(?:\.[0-9]+)?)\s*元/克"),
        ]
    }

    // Exchange table defaults
    pub fn exchange_url() -> String {
        "https://www.sge.com.cn/sjzx/mrhqsj".into()
    }
    pub fn exchange_row_pattern() -> String {
        r"<td[^>]*>\s*((?:m?Au|Pt)[0-9.]*[^<]*?)\s*</td>\s*<td[^>]*>\s*([0-9]+(?:\.[0-9]+)?)\s*</td>\s*<td[^>]*>\s*([0-9:月日年\- ]+?)\s*</td>"
            .into()
    }

    // Brand defaults
    pub fn directory_url() -> String {
        "https://www.huangjinjiage.cn/static/js/brands.js".into()
    }
    pub fn brand_quote_url() -> String {
        "https://www.huangjinjiage.cn/api/brand/price?id={id}".into()
    }
    pub fn brand_json_path() -> Vec<String> {
        vec!["data".into(), "price".into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = EngineConfig::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut config = EngineConfig::default();
        config.schedule.fast_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.schedule.page_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_pattern() {
        let mut config = EngineConfig::default();
        config.providers.quote_page.rules = vec![PatternRuleConfig {
            pattern: "([unclosed".into(),
            min: None,
            max: None,
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_quote_url_without_placeholder() {
        let mut config = EngineConfig::default();
        config.providers.brands.quote_url = "https://example.com/price".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_round_trips_through_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let mut config = EngineConfig::default();
        config.schedule.page_interval_secs = 120;
        let serialized = toml::to_string(&config).expect("serialize");
        std::fs::write(&path, serialized).expect("write");

        let loaded = EngineConfig::load(&path).expect("load");
        assert_eq!(loaded.schedule.page_interval_secs, 120);
        assert_eq!(loaded.http.timeout_secs, config.http.timeout_secs);
    }

    #[test]
    fn load_or_default_survives_missing_file() {
        let config = EngineConfig::load_or_default("/nonexistent/config.toml");
        assert!(config.validate().is_ok());
    }
}
