/*
[INPUT]:  Search queries and symbol identifiers
[OUTPUT]: Market data (symbol candidates, quote snapshots)
[POS]:    HTTP layer - market data endpoints
[UPDATE]: When adding new endpoints or changing response format
*/

use crate::http::{FinnhubClient, Result};
use crate::types::{Quote, SymbolLookup};
use reqwest::Method;

impl FinnhubClient {
    /// Search for symbol candidates matching a free-text query
    ///
    /// GET /search?q={query}&exchange={exchange}&token={token}
    pub async fn symbol_search(&self, query: &str, exchange: &str) -> Result<SymbolLookup> {
        let builder = self.api_request(
            Method::GET,
            "search",
            &[("q", query), ("exchange", exchange)],
        )?;
        self.send_json(builder).await
    }

    /// Fetch a one-shot quote snapshot for a symbol
    ///
    /// GET /quote?symbol={symbol}&token={token}
    pub async fn quote(&self, symbol: &str) -> Result<Quote> {
        let builder = self.api_request(Method::GET, "quote", &[("symbol", symbol)])?;
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{ClientConfig, FinnhubClient, FinnhubError};
    use crate::types::{Quote, SymbolCandidate, SymbolLookup};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> FinnhubClient {
        FinnhubClient::with_config_and_base_url(
            "test-token",
            ClientConfig::default(),
            &server.uri(),
        )
        .expect("client init")
    }

    #[tokio::test]
    async fn test_symbol_search() {
        let server = MockServer::start().await;
        let mock_response = r#"{
            "count": 2,
            "result": [
                {
                    "description": "APPLE INC",
                    "displaySymbol": "AAPL",
                    "symbol": "AAPL",
                    "type": "Common Stock"
                },
                {
                    "description": "APPLE HOSPITALITY REIT INC",
                    "displaySymbol": "APLE",
                    "symbol": "APLE",
                    "type": "REIT"
                }
            ]
        }"#;

        let _mock = Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "apple"))
            .and(query_param("exchange", "US"))
            .and(query_param("token", "test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_raw(mock_response, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = test_client(&server)
            .symbol_search("apple", "US")
            .await
            .expect("symbol_search failed");

        let expected = SymbolLookup {
            count: 2,
            result: vec![
                SymbolCandidate {
                    description: "APPLE INC".to_string(),
                    display_symbol: "AAPL".to_string(),
                    symbol: "AAPL".to_string(),
                    security_type: "Common Stock".to_string(),
                },
                SymbolCandidate {
                    description: "APPLE HOSPITALITY REIT INC".to_string(),
                    display_symbol: "APLE".to_string(),
                    symbol: "APLE".to_string(),
                    security_type: "REIT".to_string(),
                },
            ],
        };

        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn test_quote() {
        let server = MockServer::start().await;
        let mock_response = r#"{
            "c": 261.74,
            "d": 2.29,
            "dp": 0.8826,
            "h": 263.31,
            "l": 260.68,
            "o": 261.07,
            "pc": 259.45,
            "t": 1582641000
        }"#;

        let _mock = Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("token", "test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_raw(mock_response, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = test_client(&server).quote("AAPL").await.expect("quote failed");

        let expected = Quote {
            current: Decimal::from_str("261.74").unwrap(),
            change: Some(Decimal::from_str("2.29").unwrap()),
            percent_change: Some(Decimal::from_str("0.8826").unwrap()),
            high: Decimal::from_str("263.31").unwrap(),
            low: Decimal::from_str("260.68").unwrap(),
            open: Decimal::from_str("261.07").unwrap(),
            previous_close: Decimal::from_str("259.45").unwrap(),
            timestamp: 1_582_641_000,
        };

        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn test_quote_rate_limited() {
        let server = MockServer::start().await;

        let _mock = Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server)
            .quote("AAPL")
            .await
            .expect_err("rate limited request must fail");

        match err {
            FinnhubError::RateLimit { retry_after } => assert_eq!(retry_after, 7),
            other => panic!("Expected RateLimit, got {other:?}"),
        }
    }
}
