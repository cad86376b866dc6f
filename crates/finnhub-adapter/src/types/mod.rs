/*
[INPUT]:  API schema definitions
[OUTPUT]: Typed structs shared by the HTTP and WebSocket layers
[POS]:    Data layer - type definitions
[UPDATE]: When API schema changes or new types added
*/

pub mod models;

pub use models::{Quote, SymbolCandidate, SymbolLookup};
