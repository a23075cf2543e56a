// src/extract/mod.rs

//! Extractor library: raw response bytes/text → optional numeric price.
//!
//! Everything here is a pure function. Absence of a usable number is a
//! normal, expected outcome: these functions return `Option`/`None` and
//! never fail on malformed upstream data.

mod encoding;
mod html;
mod json;

pub use encoding::decode_text;
pub use html::{extract_rows, first_price, mean_price, PatternRule, QuoteRow};
pub use json::nested_price;
