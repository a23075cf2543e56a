// src/models/reading.rs

//! Fetch outcomes and brand directory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Source;

/// The outcome of one successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReading {
    /// Source identity the reading is stamped with
    pub source: Source,

    /// Price in CNY per gram
    pub price: f64,

    /// When the fetch completed
    pub observed_at: DateTime<Utc>,
}

impl PriceReading {
    /// Create a reading observed now.
    pub fn now(source: Source, price: f64) -> Self {
        Self {
            source,
            price,
            observed_at: Utc::now(),
        }
    }
}

/// One entry in the externally-fetched brand directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    /// Upstream identifier used to build the quote query
    pub id: String,

    /// Store name, matched against source keywords by substring
    pub name: String,
}
