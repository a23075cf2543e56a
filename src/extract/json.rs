// src/extract/json.rs

//! Structured JSON price extraction.
//!
//! Upstream JSON APIs represent the price as a numeric-looking string buried
//! under a fixed path of nested object keys. Absence of a usable number is a
//! normal outcome, never an error.

use serde_json::Value;

/// Walk `path` through nested JSON objects and parse the terminal field as a
/// base-10 float.
///
/// The terminal field may be a string (`"1923.45"`) or a bare number. Any
/// missing key, wrong type or unparsable string yields `None`.
pub fn nested_price(bytes: &[u8], path: &[impl AsRef<str>]) -> Option<f64> {
    let root: Value = serde_json::from_slice(bytes).ok()?;

    let mut node = &root;
    for key in path {
        node = node.as_object()?.get(key.as_ref())?;
    }

    match node {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "resultCode": 0,
        "resultData": {
            "datas": {
                "price": "1923.45",
                "yesterdayPrice": "1918.02",
                "time": 1700000000000
            }
        }
    }"#;

    #[test]
    fn extracts_numeric_string_at_nested_path() {
        let price = nested_price(FIXTURE.as_bytes(), &["resultData", "datas", "price"]);
        assert_eq!(price, Some(1923.45));
    }

    #[test]
    fn extracts_bare_number() {
        let body = br#"{"data": {"price": 552.3}}"#;
        assert_eq!(nested_price(body, &["data", "price"]), Some(552.3));
    }

    #[test]
    fn missing_key_yields_none() {
        assert_eq!(
            nested_price(FIXTURE.as_bytes(), &["resultData", "missing", "price"]),
            None
        );
    }

    #[test]
    fn wrong_type_yields_none() {
        // "datas" is an object, not a price field
        assert_eq!(
            nested_price(FIXTURE.as_bytes(), &["resultData", "datas"]),
            None
        );
        // array where an object is expected
        let body = br#"{"data": [1, 2, 3]}"#;
        assert_eq!(nested_price(body, &["data", "price"]), None);
    }

    #[test]
    fn unparsable_string_yields_none() {
        let body = r#"{"data": {"price": "暂无报价"}}"#;
        assert_eq!(nested_price(body.as_bytes(), &["data", "price"]), None);
    }

    #[test]
    fn invalid_json_yields_none() {
        assert_eq!(nested_price(b"<html>not json</html>", &["price"]), None);
    }
}
