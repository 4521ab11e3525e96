//! Purpose: Library crate behind the `zipnear` CLI and its tests.
//! Exports: `api` (stable surface), `core` (decoding, records, distance, catalog, errors).
//! Role: Loads a city dataset and answers postal-code and nearest-city queries.
//! Invariants: Library code logs through `tracing` and never installs a subscriber.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
