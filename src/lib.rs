// src/lib.rs

//! goldwatch: multi-source gold price aggregation engine.
//!
//! Polls a set of upstream price providers (a JSON spot API, scraped quote
//! pages and brand-routed endpoints), extracts CNY-per-gram prices with
//! provider-specific fallback strategies and keeps a concurrent-safe
//! snapshot of last known price and availability per source.

pub mod engine;
pub mod error;
pub mod extract;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use engine::Engine;
pub use error::{AppError, FetchError, Result};
pub use models::{Brand, EngineConfig, PriceReading, Source};
pub use store::{AggregationStore, Snapshot};
