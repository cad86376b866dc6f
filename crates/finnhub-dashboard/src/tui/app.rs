/*
[INPUT]:  Keystrokes, lookup replies, tick snapshots, connection state
[OUTPUT]: AppState driving symbol search, selection, and tick display
[POS]:    TUI app state and lookup dispatch
[UPDATE]: When changing search behavior, selection flow, or display state
*/

use std::time::Instant;

use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tui_input::Input;

use finnhub_adapter::{FinnhubClient, SymbolCandidate, SymbolLookup};

use crate::buffer::PriceTick;
use crate::config::DashboardConfig;
use crate::lookup::{LookupThrottle, ThrottleDecision};
use crate::stream::{ConnectionState, PriceStreamCoordinator};
use crate::tui::runtime::LogBufferHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Tab {
    Quotes,
    Logs,
}

/// Completed symbol-search call, delivered back to the UI loop.
#[derive(Debug)]
pub(super) struct LookupReply {
    pub(super) query: String,
    pub(super) manual: bool,
    pub(super) result: Result<SymbolLookup, String>,
}

pub(super) struct AppState {
    pub(super) input: Input,
    pub(super) throttle: LookupThrottle,
    pub(super) suggestions: Vec<SymbolCandidate>,
    pub(super) list_state: ListState,
    pub(super) selected: Option<SymbolCandidate>,
    pub(super) ticks: Vec<PriceTick>,
    pub(super) auto_update: bool,
    pub(super) connection: ConnectionState,
    pub(super) current_tab: Tab,
    pub(super) status_message: String,
    pub(super) error_message: Option<String>,
    pub(super) log_buffer: LogBufferHandle,
    client: FinnhubClient,
    coordinator: PriceStreamCoordinator,
    reply_tx: mpsc::UnboundedSender<LookupReply>,
    exchange: String,
}

impl AppState {
    pub(super) fn new(
        client: FinnhubClient,
        coordinator: PriceStreamCoordinator,
        config: &DashboardConfig,
        log_buffer: LogBufferHandle,
        reply_tx: mpsc::UnboundedSender<LookupReply>,
    ) -> Self {
        Self {
            input: Input::default(),
            throttle: LookupThrottle::new(config.lookup_interval()),
            suggestions: Vec::new(),
            list_state: ListState::default(),
            selected: None,
            ticks: Vec::new(),
            auto_update: true,
            connection: ConnectionState::Idle,
            current_tab: Tab::Quotes,
            status_message: "Ready".to_string(),
            error_message: None,
            log_buffer,
            client,
            coordinator,
            reply_tx,
            exchange: config.exchange.clone(),
        }
    }

    fn live_query(&self) -> String {
        self.input.value().trim().to_string()
    }

    /// React to an edited search box: throttle decides whether the call
    /// goes out now or waits for the interval.
    pub(super) fn on_input_changed(&mut self) {
        self.error_message = None;
        let query = self.live_query();
        if query.is_empty() {
            self.suggestions.clear();
            self.list_state.select(None);
            return;
        }
        match self.throttle.on_query_changed(&query, Instant::now()) {
            ThrottleDecision::IssueNow => self.spawn_lookup(query, false),
            ThrottleDecision::Scheduled { .. } => {}
        }
    }

    /// The instant the next deferred lookup becomes due, if any
    pub(super) fn next_lookup_due(&self) -> Option<Instant> {
        self.throttle.next_due()
    }

    /// Drive the throttle timer; issues the pending query if due
    pub(super) fn poll_throttle(&mut self) {
        if let Some(query) = self.throttle.fire(Instant::now()) {
            self.spawn_lookup(query, false);
        }
    }

    fn spawn_lookup(&self, query: String, manual: bool) {
        let client = self.client.clone();
        let exchange = self.exchange.clone();
        let reply_tx = self.reply_tx.clone();
        tokio::spawn(async move {
            let result = client
                .symbol_search(&query, &exchange)
                .await
                .map_err(|err| err.to_string());
            let _ = reply_tx.send(LookupReply {
                query,
                manual,
                result,
            });
        });
    }

    /// Apply a completed lookup. Replies for queries that no longer match
    /// the search box are dropped so slow responses never clobber fresher
    /// suggestions.
    pub(super) fn apply_lookup_reply(&mut self, reply: LookupReply) {
        if reply.query != self.live_query() {
            debug!(query = %reply.query, "stale lookup reply dropped");
            return;
        }

        let lookup = match reply.result {
            Ok(lookup) => lookup,
            Err(err) => {
                warn!(query = %reply.query, error = %err, "symbol lookup failed");
                self.status_message = format!("lookup failed: {err}");
                return;
            }
        };

        if reply.manual {
            let matched = lookup
                .result
                .iter()
                .find(|candidate| candidate.symbol.eq_ignore_ascii_case(&reply.query))
                .cloned();
            match matched {
                Some(candidate) => self.select_candidate(candidate),
                None => {
                    self.error_message =
                        Some(format!("no exact match for '{}'", reply.query));
                }
            }
            return;
        }

        self.status_message = format!("{} matches", lookup.count);
        self.suggestions = lookup.result;
        self.list_state.select(None);
    }

    pub(super) fn select_candidate(&mut self, candidate: SymbolCandidate) {
        self.status_message = format!("selected {}", candidate.display_symbol);
        self.selected = Some(candidate.clone());
        self.coordinator.select_symbol(candidate);
    }

    pub(super) fn move_selection(&mut self, delta: isize) {
        if self.suggestions.is_empty() {
            self.list_state.select(None);
            return;
        }
        let current = self.list_state.selected().map(|idx| idx as isize);
        let next = match current {
            Some(current) => {
                (current + delta).clamp(0, (self.suggestions.len() - 1) as isize) as usize
            }
            None if delta > 0 => 0,
            None => self.suggestions.len() - 1,
        };
        self.list_state.select(Some(next));
    }

    /// Enter: take the highlighted suggestion, or treat the raw text as an
    /// exact symbol (bypassing the throttle).
    pub(super) fn submit(&mut self) {
        if let Some(idx) = self.list_state.selected()
            && let Some(candidate) = self.suggestions.get(idx).cloned()
        {
            self.select_candidate(candidate);
            return;
        }
        let query = self.live_query();
        if query.is_empty() {
            return;
        }
        self.throttle.force(Instant::now());
        self.spawn_lookup(query, true);
    }

    pub(super) fn toggle_auto_update(&mut self) {
        self.auto_update = !self.auto_update;
        self.coordinator.set_auto_update(self.auto_update);
        self.status_message = if self.auto_update {
            "auto-update on".to_string()
        } else {
            "auto-update paused".to_string()
        };
    }

    pub(super) fn clear_search(&mut self) {
        self.input.reset();
        self.suggestions.clear();
        self.list_state.select(None);
        self.error_message = None;
    }

    pub(super) fn next_tab(&mut self) {
        self.current_tab = match self.current_tab {
            Tab::Quotes => Tab::Logs,
            Tab::Logs => Tab::Quotes,
        };
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    use crate::tui::runtime::LogBuffer;

    pub(in crate::tui) fn app_for_test() -> (AppState, mpsc::UnboundedReceiver<LookupReply>) {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let client = FinnhubClient::new("test-token").expect("client init");
        let coordinator = PriceStreamCoordinator::new_for_test();
        let config = DashboardConfig::default();
        let log_buffer = Arc::new(StdMutex::new(LogBuffer::new(16)));
        let app = AppState::new(client, coordinator, &config, log_buffer, reply_tx);
        (app, reply_rx)
    }

    fn candidate(symbol: &str) -> SymbolCandidate {
        SymbolCandidate {
            description: format!("{symbol} Inc"),
            display_symbol: symbol.to_string(),
            symbol: symbol.to_string(),
            security_type: "Common Stock".to_string(),
        }
    }

    fn lookup_for(symbols: &[&str]) -> SymbolLookup {
        SymbolLookup {
            count: symbols.len() as u32,
            result: symbols.iter().map(|s| candidate(s)).collect(),
        }
    }

    #[tokio::test]
    async fn test_stale_reply_is_dropped() {
        let (mut app, _reply_rx) = app_for_test();
        app.input = Input::new("MSFT".to_string());

        app.apply_lookup_reply(LookupReply {
            query: "AAPL".to_string(),
            manual: false,
            result: Ok(lookup_for(&["AAPL"])),
        });
        assert!(app.suggestions.is_empty());

        app.apply_lookup_reply(LookupReply {
            query: "MSFT".to_string(),
            manual: false,
            result: Ok(lookup_for(&["MSFT", "MSF.BE"])),
        });
        assert_eq!(app.suggestions.len(), 2);
    }

    #[tokio::test]
    async fn test_manual_reply_selects_exact_match_case_insensitively() {
        let (mut app, _reply_rx) = app_for_test();
        app.input = Input::new("aapl".to_string());

        app.apply_lookup_reply(LookupReply {
            query: "aapl".to_string(),
            manual: true,
            result: Ok(lookup_for(&["AAPL", "AAPL.SW"])),
        });

        let selected = app.selected.as_ref().expect("candidate selected");
        assert_eq!(selected.symbol, "AAPL");
        assert!(app.error_message.is_none());
    }

    #[tokio::test]
    async fn test_manual_reply_without_exact_match_sets_error() {
        let (mut app, _reply_rx) = app_for_test();
        app.input = Input::new("AAP".to_string());

        app.apply_lookup_reply(LookupReply {
            query: "AAP".to_string(),
            manual: true,
            result: Ok(lookup_for(&["AAPL"])),
        });

        assert!(app.selected.is_none());
        assert!(app.error_message.as_deref().unwrap_or("").contains("AAP"));
    }

    #[tokio::test]
    async fn test_failed_reply_surfaces_status() {
        let (mut app, _reply_rx) = app_for_test();
        app.input = Input::new("AAPL".to_string());

        app.apply_lookup_reply(LookupReply {
            query: "AAPL".to_string(),
            manual: false,
            result: Err("API error 500".to_string()),
        });

        assert!(app.status_message.contains("lookup failed"));
        assert!(app.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_move_selection_clamps() {
        let (mut app, _reply_rx) = app_for_test();
        app.input = Input::new("A".to_string());
        app.apply_lookup_reply(LookupReply {
            query: "A".to_string(),
            manual: false,
            result: Ok(lookup_for(&["A", "AA", "AAL"])),
        });

        app.move_selection(1);
        assert_eq!(app.list_state.selected(), Some(0));
        app.move_selection(10);
        assert_eq!(app.list_state.selected(), Some(2));
        app.move_selection(-10);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_submit_prefers_highlighted_suggestion() {
        let (mut app, mut reply_rx) = app_for_test();
        app.input = Input::new("AA".to_string());
        app.apply_lookup_reply(LookupReply {
            query: "AA".to_string(),
            manual: false,
            result: Ok(lookup_for(&["AA", "AAL"])),
        });

        app.move_selection(1);
        app.move_selection(1);
        app.submit();

        assert_eq!(app.selected.as_ref().map(|c| c.symbol.as_str()), Some("AAL"));
        // Nothing dispatched: the highlighted row answered the submit.
        assert!(reply_rx.try_recv().is_err());
    }
}
