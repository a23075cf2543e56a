// src/extract/encoding.rs

//! Response text decoding with encoding fallback.
//!
//! Several scraped upstreams serve GBK or GB18030 while declaring nothing, or
//! declaring the wrong charset. Decoding walks an ordered candidate list and
//! extraction only runs once one of them decodes cleanly.

use encoding_rs::{Encoding, GB18030, GBK, UTF_8};

/// Candidate encodings, tried in order.
const FALLBACK_CHAIN: [&Encoding; 3] = [UTF_8, GBK, GB18030];

/// Decode response bytes into text.
///
/// A `declared` label (from the Content-Type header or a meta tag) is tried
/// first when it names a known encoding, then the fallback chain. Returns
/// `None` when every candidate reports malformed sequences.
pub fn decode_text(bytes: &[u8], declared: Option<&str>) -> Option<String> {
    let declared = declared.and_then(|label| Encoding::for_label(label.as_bytes()));

    let candidates = declared.into_iter().chain(FALLBACK_CHAIN.iter().copied());
    for encoding in candidates {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Some(text.into_owned());
        }
    }
    None
}
