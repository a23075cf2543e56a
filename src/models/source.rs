// src/models/source.rs

//! The closed set of upstream price providers.
//!
//! Every provider the engine knows about is a variant here. Each variant
//! carries its display label, provider family and refresh tier through
//! lookup methods, so the scheduler and clients dispatch on data instead of
//! branching on individual sources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One upstream price provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Direct JSON spot-price API
    SpotApi,
    /// Scraped quote page with ordered fallback patterns
    QuotePage,
    /// Scraped multi-row exchange quote table
    ExchangeTable,
    /// 周大福 retail price, routed through the brand directory
    ChowTaiFook,
    /// 周生生 retail price
    ChowSangSang,
    /// 老凤祥 retail price
    LaoFengXiang,
    /// 六福 retail price
    LukFook,
}

/// How a source is fetched and parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// One GET against a fixed JSON endpoint
    DirectApi,
    /// One GET against an HTML page, parsed by pattern rules
    ScrapedPage,
    /// Parameterized JSON endpoint keyed by a directory-resolved brand id
    BrandRouted,
}

/// Refresh-interval grouping driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Refreshed on every tick
    Fast,
    /// Scraped pages, refreshed on the page interval
    Page,
    /// Brand-routed sources, refreshed on the brand interval
    Brand,
}

impl Source {
    /// Every known source, in display order.
    pub const ALL: [Source; 7] = [
        Source::SpotApi,
        Source::QuotePage,
        Source::ExchangeTable,
        Source::ChowTaiFook,
        Source::ChowSangSang,
        Source::LaoFengXiang,
        Source::LukFook,
    ];

    /// Human-readable label, as the original app displayed it.
    pub fn label(&self) -> &'static str {
        match self {
            Source::SpotApi => "金价API",
            Source::QuotePage => "今日金价",
            Source::ExchangeTable => "上海金交所",
            Source::ChowTaiFook => "周大福",
            Source::ChowSangSang => "周生生",
            Source::LaoFengXiang => "老凤祥",
            Source::LukFook => "六福珠宝",
        }
    }

    /// Stable identifier used in config, logs and the CLI.
    pub fn id(&self) -> &'static str {
        match self {
            Source::SpotApi => "spot_api",
            Source::QuotePage => "quote_page",
            Source::ExchangeTable => "exchange_table",
            Source::ChowTaiFook => "chow_tai_fook",
            Source::ChowSangSang => "chow_sang_sang",
            Source::LaoFengXiang => "lao_feng_xiang",
            Source::LukFook => "luk_fook",
        }
    }

    /// The fetch/parse strategy family for this source.
    pub fn family(&self) -> Family {
        match self {
            Source::SpotApi => Family::DirectApi,
            Source::QuotePage | Source::ExchangeTable => Family::ScrapedPage,
            Source::ChowTaiFook
            | Source::ChowSangSang
            | Source::LaoFengXiang
            | Source::LukFook => Family::BrandRouted,
        }
    }

    /// The refresh tier this source belongs to.
    pub fn tier(&self) -> Tier {
        match self.family() {
            Family::DirectApi => Tier::Fast,
            Family::ScrapedPage => Tier::Page,
            Family::BrandRouted => Tier::Brand,
        }
    }

    /// Keyword matched against brand directory names. Only brand-routed
    /// sources carry one.
    pub fn brand_keyword(&self) -> Option<&'static str> {
        match self {
            Source::ChowTaiFook => Some("周大福"),
            Source::ChowSangSang => Some("周生生"),
            Source::LaoFengXiang => Some("老凤祥"),
            Source::LukFook => Some("六福"),
            _ => None,
        }
    }

    /// All sources in the given tier.
    pub fn in_tier(tier: Tier) -> impl Iterator<Item = Source> {
        Self::ALL.into_iter().filter(move |s| s.tier() == tier)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.id())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|src| src.id() == s)
            .ok_or_else(|| format!("unknown source '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_covers_every_tier() {
        assert_eq!(Source::in_tier(Tier::Fast).count(), 1);
        assert_eq!(Source::in_tier(Tier::Page).count(), 2);
        assert_eq!(Source::in_tier(Tier::Brand).count(), 4);
        assert_eq!(Source::ALL.len(), 7);
    }

    #[test]
    fn brand_keywords_only_on_brand_sources() {
        for source in Source::ALL {
            assert_eq!(
                source.brand_keyword().is_some(),
                source.family() == Family::BrandRouted,
                "keyword/family mismatch for {source}"
            );
        }
    }

    #[test]
    fn ids_round_trip_through_from_str() {
        for source in Source::ALL {
            assert_eq!(source.id().parse::<Source>(), Ok(source));
        }
        assert!("not_a_source".parse::<Source>().is_err());
    }
}
