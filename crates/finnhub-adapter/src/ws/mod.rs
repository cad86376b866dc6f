/*
[INPUT]:  WebSocket connection and message definitions
[OUTPUT]: Real-time trade tick stream
[POS]:    WebSocket layer - streaming market data
[UPDATE]: When adding new channels or changing connection logic
*/

pub mod client;
pub mod message;

pub use client::FinnhubSocket;
pub use message::{StreamCommand, StreamMessage, TradeTick};
