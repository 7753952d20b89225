//! Core types and import engine for the fessi waste-disposal knowledge graph.

/// Waste-item catalog loading (CSV).
pub mod catalog;
/// Classification of canonical targets into waste streams and facilities.
pub mod classify;
/// Facility directory loading and record merging (JSON).
pub mod directory;
/// Graph merge engine turning parsed items into store writes.
pub mod engine;
/// Deterministic name fingerprints.
pub mod fingerprint;
/// In-memory graph store used for tests and local runs.
pub mod memory;
/// Domain models shared by loaders, engine and stores.
pub mod model;
/// Canonical spelling for known target-name variants.
pub mod normalize;
/// Disposal-target parser for raw catalog cells.
pub mod parser;
/// Traits describing the graph store interface.
pub mod ports;
/// High-level service facade used by clients.
pub mod service;
/// Splitter for run-on cells holding several target names.
pub mod splitter;
/// Heuristic filter separating target names from notes and hints.
pub mod validity;

pub use catalog::*;
pub use classify::*;
pub use directory::*;
pub use engine::*;
pub use fingerprint::*;
pub use model::*;
pub use ports::*;
pub use service::*;
