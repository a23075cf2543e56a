// src/extract/html.rs

//! Scraped HTML price extraction.
//!
//! Two strategies over decoded page text: an ordered list of single-value
//! pattern rules with optional plausibility bounds, and a multi-row table
//! scan that averages all matched quote rows.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::PatternRuleConfig;

/// One compiled pattern rule: a regex with a single numeric capture group and
/// an optional plausible price range.
#[derive(Debug, Clone)]
pub struct PatternRule {
    regex: Regex,
    min: Option<f64>,
    max: Option<f64>,
}

impl PatternRule {
    /// Compile a rule from its config form.
    pub fn compile(config: &PatternRuleConfig) -> Result<Self> {
        let regex =
            Regex::new(&config.pattern).map_err(|e| AppError::pattern(&config.pattern, e))?;
        Ok(Self {
            regex,
            min: config.min,
            max: config.max,
        })
    }

    /// Compile an ordered rule list.
    pub fn compile_all(configs: &[PatternRuleConfig]) -> Result<Vec<Self>> {
        configs.iter().map(Self::compile).collect()
    }

    fn plausible(&self, price: f64) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// Return the first plausible price captured by the rule list.
///
/// Rules are tried in order; within a rule, matches in page order. A capture
/// that fails to parse or falls outside the rule's bounds is skipped and the
/// scan continues, so an implausible match never shadows a later valid one.
pub fn first_price(text: &str, rules: &[PatternRule]) -> Option<f64> {
    for rule in rules {
        for captures in rule.regex.captures_iter(text) {
            let Some(raw) = captures.get(1) else {
                continue;
            };
            let Ok(price) = raw.as_str().trim().parse::<f64>() else {
                continue;
            };
            if rule.plausible(price) {
                return Some(price);
            }
        }
    }
    None
}

/// One market quote row from a multi-row table page.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    /// Contract or product label, e.g. "Au99.99"
    pub label: String,

    /// Quoted price
    pub price: f64,

    /// Quote timestamp text, as displayed on the page
    pub time_text: String,
}

/// Extract all quote rows matched by `row_rule` (three capture groups:
/// label, price, timestamp text). Rows whose price fails to parse are
/// skipped.
pub fn extract_rows(text: &str, row_rule: &Regex) -> Vec<QuoteRow> {
    row_rule
        .captures_iter(text)
        .filter_map(|captures| {
            let label = captures.get(1)?.as_str().trim().to_string();
            let price: f64 = captures.get(2)?.as_str().trim().parse().ok()?;
            let time_text = captures.get(3)?.as_str().trim().to_string();
            Some(QuoteRow {
                label,
                price,
                time_text,
            })
        })
        .collect()
}

/// Arithmetic mean of the row prices, rounded to two decimal places.
/// `None` when no rows matched.
pub fn mean_price(rows: &[QuoteRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let sum: f64 = rows.iter().map(|row| row.price).sum();
    let mean = sum / rows.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}
