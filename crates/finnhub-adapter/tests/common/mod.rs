/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for finnhub-adapter tests

use finnhub_adapter::{ClientConfig, FinnhubClient};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Build a client pointed at the mock server
pub fn mock_client(server: &MockServer) -> FinnhubClient {
    FinnhubClient::with_config_and_base_url("test-token", ClientConfig::default(), &server.uri())
        .expect("client init")
}
