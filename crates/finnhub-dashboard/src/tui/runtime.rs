/*
[INPUT]:  Crossterm input, lookup replies, coordinator watch channels, log buffer
[OUTPUT]: Ratatui run loop, rendering ticks, and log buffer utilities
[POS]:    TUI runtime loop and shared helpers
[UPDATE]: When changing TUI refresh cadence, channels, or log capture
*/

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::Event as CrosstermEvent;
use ratatui::style::{Color, Modifier, Style};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

use finnhub_adapter::FinnhubClient;

use crate::config::DashboardConfig;
use crate::stream::PriceStreamCoordinator;

use super::app::AppState;
use super::events::handle_key_event;
use super::terminal::TerminalGuard;
use super::ui::draw_ui;

const UI_TICK_INTERVAL: Duration = Duration::from_millis(250);
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const LOG_BUFFER_CAPACITY: usize = 2000;

pub type LogBufferHandle = Arc<StdMutex<LogBuffer>>;

#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity,
        }
    }

    pub fn push_line(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// `MakeWriter` bridge routing tracing output into the in-memory log
/// buffer rendered on the Logs tab; stdout is owned by the terminal.
#[derive(Clone)]
pub struct LogWriterFactory {
    buffer: LogBufferHandle,
}

impl LogWriterFactory {
    pub fn new(buffer: LogBufferHandle) -> Self {
        Self { buffer }
    }
}

pub struct LogWriter {
    buffer: LogBufferHandle,
    partial: String,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let chunk = String::from_utf8_lossy(buf);
        self.partial.push_str(&chunk);
        while let Some(pos) = self.partial.find('\n') {
            let line = self.partial[..pos].trim_end_matches('\r').to_string();
            self.partial = self.partial[pos + 1..].to_string();
            let buffer = self.buffer.clone();
            let mut guard = buffer.lock().expect("log buffer lock");
            guard.push_line(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            let buffer = self.buffer.clone();
            let mut guard = buffer.lock().expect("log buffer lock");
            guard.push_line(line);
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: self.buffer.clone(),
            partial: String::new(),
        }
    }
}

enum UiEvent {
    Input(CrosstermEvent),
}

pub async fn run_tui(
    client: FinnhubClient,
    coordinator: PriceStreamCoordinator,
    config: &DashboardConfig,
    log_buffer: LogBufferHandle,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut terminal = TerminalGuard::new()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let input_shutdown = CancellationToken::new();
    let input_shutdown_clone = input_shutdown.clone();

    tokio::task::spawn_blocking(move || {
        while !input_shutdown_clone.is_cancelled() {
            if crossterm::event::poll(INPUT_POLL_INTERVAL).unwrap_or(false) {
                if let Ok(event) = crossterm::event::read() {
                    let _ = event_tx.send(UiEvent::Input(event));
                }
            }
        }
    });

    let mut ticks_rx = coordinator.subscribe_ticks();
    let mut connection_rx = coordinator.subscribe_connection_state();
    let mut error_rx = coordinator.subscribe_last_error();

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let mut app = AppState::new(client, coordinator, config, log_buffer, reply_tx);

    let mut tick = tokio::time::interval(UI_TICK_INTERVAL);
    let mut ticks_active = true;
    let mut connection_active = true;
    let mut errors_active = true;
    let mut should_quit = false;

    while !should_quit {
        let lookup_due = app.next_lookup_due();

        tokio::select! {
            _ = tick.tick() => {}
            _ = shutdown.cancelled() => {
                should_quit = true;
            }
            _ = async {
                match lookup_due {
                    Some(due) => tokio::time::sleep_until(due.into()).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                app.poll_throttle();
            }
            maybe_event = event_rx.recv() => {
                if let Some(UiEvent::Input(CrosstermEvent::Key(key))) = maybe_event {
                    if handle_key_event(&mut app, key) {
                        should_quit = true;
                    }
                }
            }
            maybe_reply = reply_rx.recv() => {
                if let Some(reply) = maybe_reply {
                    app.apply_lookup_reply(reply);
                }
            }
            changed = ticks_rx.changed(), if ticks_active => {
                match changed {
                    Ok(()) => app.ticks = ticks_rx.borrow_and_update().clone(),
                    Err(_) => ticks_active = false,
                }
            }
            changed = connection_rx.changed(), if connection_active => {
                match changed {
                    Ok(()) => app.connection = connection_rx.borrow_and_update().clone(),
                    Err(_) => connection_active = false,
                }
            }
            changed = error_rx.changed(), if errors_active => {
                match changed {
                    Ok(()) => {
                        if let Some(message) = error_rx.borrow_and_update().clone() {
                            app.status_message = message;
                        }
                    }
                    Err(_) => errors_active = false,
                }
            }
        }

        terminal.draw(|frame| draw_ui(frame, &mut app))?;
    }

    input_shutdown.cancel();
    terminal.restore();
    Ok(())
}

pub(super) fn border_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub(super) fn highlight_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

pub(super) fn error_style() -> Style {
    Style::default()
        .fg(Color::LightRed)
        .add_modifier(Modifier::BOLD)
}
