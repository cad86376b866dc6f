/*
[INPUT]:  Finnhub client, stream coordinator, configuration, and log buffer
[OUTPUT]: Ratatui-based dashboard for symbol lookup and live prices
[POS]:    TUI module for finnhub-dashboard binary
[UPDATE]: When changing TUI layout, keybindings, or runtime controls
*/

mod app;
mod events;
mod runtime;
mod terminal;
mod ui;

pub use runtime::{run_tui, LogBuffer, LogBufferHandle, LogWriterFactory, LOG_BUFFER_CAPACITY};
