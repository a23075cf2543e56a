// src/models/mod.rs

//! Domain models for the aggregation engine.

mod config;
mod reading;
mod source;

// Re-export all public types
pub use config::{
    BrandProvider, EngineConfig, ExchangeProvider, HttpConfig, PageProvider, PatternRuleConfig,
    ProviderConfig, ScheduleConfig, SpotProvider,
};
pub use reading::{Brand, PriceReading};
pub use source::{Family, Source, Tier};
