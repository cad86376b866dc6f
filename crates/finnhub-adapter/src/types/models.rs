/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One symbol-search result row, exactly as the vendor returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCandidate {
    pub description: String,
    #[serde(rename = "displaySymbol")]
    pub display_symbol: String,
    pub symbol: String,
    /// Security type (e.g. "Common Stock", "ETP")
    #[serde(rename = "type")]
    pub security_type: String,
}

/// Symbol lookup response. `result` preserves the vendor's relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLookup {
    pub count: u32,
    pub result: Vec<SymbolCandidate>,
}

/// Quote snapshot for a symbol.
///
/// Field names follow the vendor's compact schema: `c` current price,
/// `d` change, `dp` percent change, `h`/`l`/`o` session high/low/open,
/// `pc` previous close, `t` unix timestamp (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "c", with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(rename = "d", default, with = "rust_decimal::serde::float_option")]
    pub change: Option<Decimal>,
    #[serde(rename = "dp", default, with = "rust_decimal::serde::float_option")]
    pub percent_change: Option<Decimal>,
    #[serde(rename = "h", with = "rust_decimal::serde::float")]
    pub high: Decimal,
    #[serde(rename = "l", with = "rust_decimal::serde::float")]
    pub low: Decimal,
    #[serde(rename = "o", with = "rust_decimal::serde::float")]
    pub open: Decimal,
    #[serde(rename = "pc", with = "rust_decimal::serde::float")]
    pub previous_close: Decimal,
    #[serde(rename = "t")]
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_symbol_candidate_vendor_field_names() {
        let json = r#"{
            "description": "APPLE INC",
            "displaySymbol": "AAPL",
            "symbol": "AAPL",
            "type": "Common Stock"
        }"#;
        let candidate: SymbolCandidate = serde_json::from_str(json).expect("deserialize");
        assert_eq!(candidate.display_symbol, "AAPL");
        assert_eq!(candidate.security_type, "Common Stock");

        let round_trip = serde_json::to_value(&candidate).expect("serialize");
        assert_eq!(round_trip["displaySymbol"], "AAPL");
        assert_eq!(round_trip["type"], "Common Stock");
    }

    #[test]
    fn test_quote_nullable_change_fields() {
        let json = r#"{"c":261.74,"d":null,"dp":null,"h":263.31,"l":260.68,"o":261.07,"pc":259.45,"t":1582641000}"#;
        let quote: Quote = serde_json::from_str(json).expect("deserialize");
        assert_eq!(quote.current, Decimal::from_str("261.74").unwrap());
        assert_eq!(quote.change, None);
        assert_eq!(quote.percent_change, None);
        assert_eq!(quote.timestamp, 1_582_641_000);
    }
}
