/*
[INPUT]:  WebSocket test scenarios
[OUTPUT]: Test results for WebSocket client
[POS]:    Integration tests - WebSocket
[UPDATE]: When WebSocket client changes
*/

use finnhub_adapter::{FinnhubError, FinnhubSocket};

#[test]
fn test_socket_creation() {
    let mut ws = FinnhubSocket::new();
    assert!(ws.take_receiver().is_some());
}

#[test]
fn test_socket_default() {
    let mut ws: FinnhubSocket = Default::default();
    assert!(ws.take_receiver().is_some());
}

#[test]
fn test_socket_receiver_take_once() {
    let mut ws = FinnhubSocket::new();
    assert!(ws.take_receiver().is_some());
    assert!(ws.take_receiver().is_none());
}

#[tokio::test]
async fn test_subscribe_before_connect_fails() {
    let ws = FinnhubSocket::new();
    let err = ws
        .subscribe("AAPL")
        .await
        .expect_err("subscribe without connection must fail");
    assert!(matches!(err, FinnhubError::WebSocket(_)));
}
