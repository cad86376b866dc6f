/*
[INPUT]:  WebSocket URL with API token for authentication
[OUTPUT]: Real-time trade ticks via channels
[POS]:    WebSocket layer - real-time data stream handling
[UPDATE]: When adding new channels or changing connection logic
*/

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info};

use crate::http::{FinnhubError, Result};
use crate::ws::message::{StreamCommand, StreamMessage};

const MESSAGE_SAMPLE_LIMIT: usize = 3;
const COMMAND_LOG_LIMIT: usize = 10;
const PARSE_FAIL_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static MESSAGE_SAMPLE_COUNT: AtomicUsize = AtomicUsize::new(0);
static COMMAND_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// WebSocket client for the Finnhub trade stream.
///
/// The socket is opened explicitly with [`FinnhubSocket::connect`] and owned
/// by the caller; when the pump task exits it emits a final
/// [`StreamMessage::Disconnected`] so the owner can observe stream loss.
#[derive(Debug)]
pub struct FinnhubSocket {
    message_tx: mpsc::Sender<StreamMessage>,
    message_rx: Option<mpsc::Receiver<StreamMessage>>,
    outbound_tx: Arc<Mutex<Option<mpsc::Sender<WsMessage>>>>,
}

impl FinnhubSocket {
    /// Create a new, unconnected socket
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            message_tx: tx,
            message_rx: Some(rx),
            outbound_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the message receiver
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<StreamMessage>> {
        self.message_rx.take()
    }

    /// Subscribe to trade updates for a symbol
    pub async fn subscribe(&self, symbol: &str) -> Result<()> {
        self.send_command(StreamCommand::Subscribe {
            symbol: symbol.to_string(),
        })
        .await
    }

    /// Unsubscribe from trade updates for a symbol
    pub async fn unsubscribe(&self, symbol: &str) -> Result<()> {
        self.send_command(StreamCommand::Unsubscribe {
            symbol: symbol.to_string(),
        })
        .await
    }

    /// Connect to the trade stream and spawn the socket pump
    pub async fn connect(&self, url: &str) -> Result<()> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|err| FinnhubError::WebSocket(err.to_string()))?;
        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel(100);
        let outbound_state = self.outbound_tx.clone();

        {
            let mut guard = outbound_state.lock().await;
            if guard.is_some() {
                return Err(FinnhubError::WebSocket(
                    "WebSocket already connected".to_string(),
                ));
            }
            *guard = Some(outbound_tx);
        }

        let message_tx = self.message_tx.clone();
        let outbound_state_for_task = outbound_state.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(message) => {
                                if write.send(message).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WsMessage::Close(_))) => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                            Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                            Some(Ok(message)) => {
                                if let Some(parsed) = parse_message(message)
                                    && message_tx.send(parsed).await.is_err()
                                {
                                    break;
                                }
                            }
                            Some(Err(_)) | None => {
                                break;
                            }
                        }
                    }
                }
            }

            let mut guard = outbound_state_for_task.lock().await;
            *guard = None;
            drop(guard);

            let _ = message_tx.send(StreamMessage::Disconnected).await;
        });

        Ok(())
    }

    async fn send_command(&self, command: StreamCommand) -> Result<()> {
        let sender = {
            let guard = self.outbound_tx.lock().await;
            guard
                .clone()
                .ok_or_else(|| FinnhubError::WebSocket("WebSocket not connected".to_string()))?
        };

        let payload = serde_json::to_string(&command)?;
        sender
            .send(WsMessage::Text(payload.into()))
            .await
            .map_err(|_| {
                FinnhubError::WebSocket("WebSocket send channel closed".to_string())
            })?;

        log_command_sent(&command);

        Ok(())
    }
}

impl Default for FinnhubSocket {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_message(message: WsMessage) -> Option<StreamMessage> {
    let text: String = match message {
        WsMessage::Text(text) => text.to_string(),
        WsMessage::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok()?,
        _ => return Some(StreamMessage::Other),
    };

    match serde_json::from_str::<StreamMessage>(&text) {
        Ok(parsed) => {
            log_message_sample_once(&parsed);
            Some(parsed)
        }
        Err(err) => {
            log_parse_fail_once(&err, &text);
            Some(StreamMessage::Other)
        }
    }
}

fn log_command_sent(command: &StreamCommand) {
    let count = COMMAND_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= COMMAND_LOG_LIMIT {
        return;
    }

    let action = match command {
        StreamCommand::Subscribe { .. } => "subscribe",
        StreamCommand::Unsubscribe { .. } => "unsubscribe",
    };
    info!(
        sample_index = count + 1,
        sample_limit = COMMAND_LOG_LIMIT,
        action,
        symbol = command.symbol(),
        "ws command sent"
    );
}

fn log_message_sample_once(message: &StreamMessage) {
    let count = MESSAGE_SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= MESSAGE_SAMPLE_LIMIT {
        return;
    }

    match message {
        StreamMessage::Trade { data } => {
            info!(
                sample_index = count + 1,
                sample_limit = MESSAGE_SAMPLE_LIMIT,
                frame = "trade",
                ticks = data.len(),
                "ws message sample"
            );
        }
        StreamMessage::Ping => {
            info!(
                sample_index = count + 1,
                sample_limit = MESSAGE_SAMPLE_LIMIT,
                frame = "ping",
                "ws message sample"
            );
        }
        StreamMessage::Other | StreamMessage::Disconnected => {
            info!(
                sample_index = count + 1,
                sample_limit = MESSAGE_SAMPLE_LIMIT,
                frame = "other",
                "ws message sample"
            );
        }
    }
}

fn log_parse_fail_once(err: &serde_json::Error, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "ws message parse failed"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            message = %preview,
            "ws message parse failed"
        );
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut out = String::with_capacity(max_len + 3);
    out.push_str(&value[..max_len]);
    out.push_str("...");
    out
}
