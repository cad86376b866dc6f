/*
[INPUT]:  Symbol selections + Finnhub trade WebSocket stream
[OUTPUT]: Bounded tick snapshots via `watch` + connection state notifications
[POS]:    Data layer - subscription coordination and tick distribution
[UPDATE]: When changing subscription ordering, reconnection backoff, or shutdown semantics
*/

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use finnhub_adapter::{
    FinnhubClient, FinnhubSocket, Quote, StreamCommand, StreamMessage, SymbolCandidate,
};

use crate::buffer::{PriceTick, TickBuffer};

const DEFAULT_MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No symbol selected yet; the stream is opened lazily on first selection
    Idle,
    Connected,
    Disconnected { retry_count: u32 },
}

#[derive(Debug)]
enum CoordinatorCommand {
    Select(SymbolCandidate),
    SetAutoUpdate(bool),
    Shutdown,
}

/// Coordinates the single trade-stream connection.
///
/// At most one symbol is active at a time. Selecting a new one sends
/// unsubscribe-old then subscribe-new, and fires a one-shot quote fetch to
/// seed the display; none of the three wait on each other. Streamed trade
/// batches are prepended to a bounded newest-first buffer whose snapshot is
/// broadcast through a `watch` channel.
#[derive(Debug)]
pub struct PriceStreamCoordinator {
    cmd_tx: mpsc::UnboundedSender<CoordinatorCommand>,
    ticks_tx: watch::Sender<Vec<PriceTick>>,
    connection_state: watch::Sender<ConnectionState>,
    last_error: watch::Sender<Option<String>>,
    shutdown: CancellationToken,
    worker_handle: Option<tokio::task::JoinHandle<()>>,
}

impl PriceStreamCoordinator {
    /// Spawn the coordinator worker. `ws_url` must already carry the token.
    pub fn spawn(client: FinnhubClient, ws_url: String, tick_capacity: usize) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (ticks_tx, _rx) = watch::channel(Vec::new());
        let (connection_state, _rx) = watch::channel(ConnectionState::Idle);
        let (last_error, _rx) = watch::channel(None);
        let shutdown = CancellationToken::new();

        let worker = CoordinatorWorker::new(
            client,
            ws_url,
            tick_capacity,
            cmd_rx,
            ticks_tx.clone(),
            connection_state.clone(),
            last_error.clone(),
            shutdown.clone(),
        );
        let worker_handle = Some(tokio::spawn(async move {
            worker.run().await;
        }));

        Self {
            cmd_tx,
            ticks_tx,
            connection_state,
            last_error,
            shutdown,
            worker_handle,
        }
    }

    /// Handle without a worker, for driving state directly in tests
    #[cfg(test)]
    pub(crate) fn new_for_test() -> Self {
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let (ticks_tx, _rx) = watch::channel(Vec::new());
        let (connection_state, _rx) = watch::channel(ConnectionState::Idle);
        let (last_error, _rx) = watch::channel(None);
        Self {
            cmd_tx,
            ticks_tx,
            connection_state,
            last_error,
            shutdown: CancellationToken::new(),
            worker_handle: None,
        }
    }

    /// Make `candidate` the active symbol
    pub fn select_symbol(&self, candidate: SymbolCandidate) {
        let _ = self.cmd_tx.send(CoordinatorCommand::Select(candidate));
    }

    /// Gate whether streamed trade frames are applied
    pub fn set_auto_update(&self, enabled: bool) {
        let _ = self.cmd_tx.send(CoordinatorCommand::SetAutoUpdate(enabled));
    }

    /// Subscribe to tick snapshots (newest first, capped)
    pub fn subscribe_ticks(&self) -> watch::Receiver<Vec<PriceTick>> {
        self.ticks_tx.subscribe()
    }

    /// Subscribe to connection state changes
    pub fn subscribe_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection_state.subscribe()
    }

    /// Subscribe to surfaced background errors (quote seed failures)
    pub fn subscribe_last_error(&self) -> watch::Receiver<Option<String>> {
        self.last_error.subscribe()
    }

    /// Trigger a graceful shutdown of the worker
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let _ = self.cmd_tx.send(CoordinatorCommand::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        self.worker_handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for PriceStreamCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug)]
struct SeedEvent {
    symbol: String,
    result: Result<PriceTick, String>,
}

#[derive(Debug)]
struct CoordinatorWorker {
    client: FinnhubClient,
    ws_url: String,
    buffer: TickBuffer,
    active: Option<SymbolCandidate>,
    auto_update: bool,
    cmd_rx: mpsc::UnboundedReceiver<CoordinatorCommand>,
    seed_tx: mpsc::Sender<SeedEvent>,
    seed_rx: mpsc::Receiver<SeedEvent>,
    ticks_tx: watch::Sender<Vec<PriceTick>>,
    connection_state: watch::Sender<ConnectionState>,
    last_error: watch::Sender<Option<String>>,
    shutdown: CancellationToken,
    max_retries: u32,
}

impl CoordinatorWorker {
    #[allow(clippy::too_many_arguments)]
    fn new(
        client: FinnhubClient,
        ws_url: String,
        tick_capacity: usize,
        cmd_rx: mpsc::UnboundedReceiver<CoordinatorCommand>,
        ticks_tx: watch::Sender<Vec<PriceTick>>,
        connection_state: watch::Sender<ConnectionState>,
        last_error: watch::Sender<Option<String>>,
        shutdown: CancellationToken,
    ) -> Self {
        let (seed_tx, seed_rx) = mpsc::channel(8);
        Self {
            client,
            ws_url,
            buffer: TickBuffer::new(tick_capacity),
            active: None,
            auto_update: true,
            cmd_rx,
            seed_tx,
            seed_rx,
            ticks_tx,
            connection_state,
            last_error,
            shutdown,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    async fn run(mut self) {
        let mut retry_count: u32 = 0;

        'run: loop {
            if self.shutdown.is_cancelled() {
                let _ = self
                    .connection_state
                    .send(ConnectionState::Disconnected { retry_count });
                break 'run;
            }

            // Lazily connected: wait for the first selection.
            if self.active.is_none() {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        break 'run;
                    }
                    cmd = self.cmd_rx.recv() => {
                        match cmd {
                            Some(CoordinatorCommand::Select(candidate)) => {
                                self.active = Some(candidate);
                            }
                            Some(CoordinatorCommand::SetAutoUpdate(enabled)) => {
                                self.set_auto_update(enabled);
                            }
                            Some(CoordinatorCommand::Shutdown) | None => {
                                break 'run;
                            }
                        }
                    }
                }

                continue;
            }

            match self.connect_once().await {
                Ok((ws, mut rx)) => {
                    retry_count = 0;

                    let _ = self.connection_state.send(ConnectionState::Connected);
                    info!("trade stream connected");

                    if let Err(err) = self.resubscribe_active(&ws).await {
                        warn!(error = %err, "resubscribe after connect failed");
                        let _ = self
                            .connection_state
                            .send(ConnectionState::Disconnected { retry_count });
                        continue 'run;
                    }

                    match self.stream_loop(&ws, &mut rx).await {
                        StreamExit::Shutdown => {
                            drop(rx);
                            drop(ws);
                            let _ = self
                                .connection_state
                                .send(ConnectionState::Disconnected { retry_count });
                            break 'run;
                        }
                        StreamExit::Disconnected => {
                            drop(rx);
                            drop(ws);
                            let _ = self
                                .connection_state
                                .send(ConnectionState::Disconnected { retry_count });
                            continue 'run;
                        }
                    }
                }
                Err(err_msg) => {
                    retry_count = retry_count.saturating_add(1);

                    let _ = self
                        .connection_state
                        .send(ConnectionState::Disconnected { retry_count });

                    if retry_count >= self.max_retries {
                        warn!(retry_count, max_retries = self.max_retries, error = %err_msg, "trade stream gave up reconnecting");
                        break 'run;
                    }

                    let backoff = backoff_duration(retry_count);
                    warn!(retry_count, ?backoff, error = %err_msg, "trade stream connect failed; retrying with backoff");

                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            break 'run;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                        cmd = self.cmd_rx.recv() => {
                            match cmd {
                                Some(CoordinatorCommand::Select(candidate)) => {
                                    self.active = Some(candidate);
                                }
                                Some(CoordinatorCommand::SetAutoUpdate(enabled)) => {
                                    self.set_auto_update(enabled);
                                }
                                Some(CoordinatorCommand::Shutdown) | None => {
                                    break 'run;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    async fn connect_once(&self) -> Result<(FinnhubSocket, mpsc::Receiver<StreamMessage>), String> {
        let mut ws = FinnhubSocket::new();

        info!("connecting to trade stream");
        ws.connect(&self.ws_url).await.map_err(|err| err.to_string())?;

        let rx = ws
            .take_receiver()
            .ok_or_else(|| "FinnhubSocket receiver already taken".to_string())?;

        Ok((ws, rx))
    }

    /// Subscribe the active symbol on a fresh connection and reseed the
    /// display with a quote snapshot.
    async fn resubscribe_active(&self, ws: &FinnhubSocket) -> Result<(), String> {
        if let Some(active) = &self.active {
            ws.subscribe(&active.display_symbol)
                .await
                .map_err(|err| err.to_string())?;
            self.spawn_seed_fetch(active);
        }
        Ok(())
    }

    async fn stream_loop(
        &mut self,
        ws: &FinnhubSocket,
        rx: &mut mpsc::Receiver<StreamMessage>,
    ) -> StreamExit {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("coordinator shutdown requested");
                    return StreamExit::Shutdown;
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(CoordinatorCommand::Select(next)) => {
                            let previous = self.active.replace(next.clone());
                            let commands = subscription_commands(
                                previous.as_ref().map(|c| c.display_symbol.as_str()),
                                &next.display_symbol,
                            );
                            for command in commands {
                                let sent = match &command {
                                    StreamCommand::Subscribe { symbol } => ws.subscribe(symbol).await,
                                    StreamCommand::Unsubscribe { symbol } => ws.unsubscribe(symbol).await,
                                };
                                if let Err(err) = sent {
                                    warn!(symbol = command.symbol(), error = %err, "subscription command failed");
                                    return StreamExit::Disconnected;
                                }
                            }
                            self.spawn_seed_fetch(&next);
                        }
                        Some(CoordinatorCommand::SetAutoUpdate(enabled)) => {
                            self.set_auto_update(enabled);
                        }
                        Some(CoordinatorCommand::Shutdown) | None => {
                            return StreamExit::Shutdown;
                        }
                    }
                }
                seed = self.seed_rx.recv() => {
                    if let Some(event) = seed {
                        self.handle_seed_event(event);
                    }
                }
                msg = rx.recv() => {
                    match msg {
                        Some(message) => {
                            if let Some(exit) = self.handle_stream_message(message) {
                                return exit;
                            }
                        }
                        None => {
                            warn!("trade stream ended");
                            return StreamExit::Disconnected;
                        }
                    }
                }
            }
        }
    }

    fn set_auto_update(&mut self, enabled: bool) {
        self.auto_update = enabled;
        info!(enabled, "auto-update toggled");
    }

    fn handle_stream_message(&mut self, message: StreamMessage) -> Option<StreamExit> {
        match message {
            StreamMessage::Trade { data } => {
                if !self.auto_update {
                    debug!(ticks = data.len(), "auto-update off; frame dropped");
                    return None;
                }
                let batch: Vec<PriceTick> = data
                    .into_iter()
                    .map(|tick| {
                        PriceTick::new(tick.s, tick.p, tick.v.unwrap_or(Decimal::ZERO), tick.t)
                    })
                    .collect();
                self.buffer.push_front_batch(batch);
                self.publish_ticks();
                None
            }
            StreamMessage::Ping | StreamMessage::Other => None,
            StreamMessage::Disconnected => {
                warn!("trade stream dropped");
                Some(StreamExit::Disconnected)
            }
        }
    }

    fn handle_seed_event(&mut self, event: SeedEvent) {
        match event.result {
            Ok(tick) => {
                self.buffer.push_front(tick);
                self.publish_ticks();
            }
            Err(err) => {
                warn!(symbol = %event.symbol, error = %err, "quote seed fetch failed");
                let _ = self
                    .last_error
                    .send(Some(format!("quote {} failed: {err}", event.symbol)));
            }
        }
    }

    /// Fire-and-forget quote fetch; the result comes back through the seed
    /// channel so buffer mutation stays on the worker.
    fn spawn_seed_fetch(&self, candidate: &SymbolCandidate) {
        let client = self.client.clone();
        let seed_tx = self.seed_tx.clone();
        let symbol = candidate.display_symbol.clone();
        tokio::spawn(async move {
            let result = fetch_seed(&client, &symbol).await;
            let _ = seed_tx.send(SeedEvent { symbol, result }).await;
        });
    }

    fn publish_ticks(&self) {
        let _ = self.ticks_tx.send(self.buffer.snapshot());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamExit {
    Disconnected,
    Shutdown,
}

/// Subscription frames for a selection change: unsubscribe the previous
/// symbol (when there is one) strictly before subscribing the next.
fn subscription_commands(previous: Option<&str>, next: &str) -> Vec<StreamCommand> {
    let mut commands = Vec::with_capacity(2);
    if let Some(previous) = previous {
        commands.push(StreamCommand::Unsubscribe {
            symbol: previous.to_string(),
        });
    }
    commands.push(StreamCommand::Subscribe {
        symbol: next.to_string(),
    });
    commands
}

async fn fetch_seed(client: &FinnhubClient, symbol: &str) -> Result<PriceTick, String> {
    match client.quote(symbol).await {
        Ok(quote) => Ok(seed_tick(symbol, &quote)),
        Err(err) => Err(err.to_string()),
    }
}

fn seed_tick(symbol: &str, quote: &Quote) -> PriceTick {
    PriceTick::new(
        symbol,
        quote.current,
        Decimal::ZERO,
        Utc::now().timestamp_millis(),
    )
}

fn backoff_duration(retry_count: u32) -> Duration {
    let exp = retry_count.saturating_sub(1).min(63);
    let secs = 1u64 << exp;
    Duration::from_secs(secs.min(30))
}
