/*
[INPUT]:  Public API exports for finnhub-dashboard crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod buffer;
pub mod config;
pub mod lookup;
pub mod stream;
pub mod tui;

// Re-export main types for convenience
pub use buffer::{PriceTick, TickBuffer};
pub use config::DashboardConfig;
pub use lookup::{LookupThrottle, ThrottleDecision};
pub use stream::{ConnectionState, PriceStreamCoordinator};
