//! # rsjoin
//!
//! A reduce-side equi-join engine for MapReduce-style processing of mixed
//! CSV records. Two logically distinct tables arrive interleaved on one
//! stream and are told apart only by column count; the engine tags each
//! record with its source table, partitions by join key, groups each
//! partition into per-key runs, and joins the left/right record sets for
//! every key.
//!
//! ## Usage
//!
//! ```bash
//! rsjoin map < mixed.csv          # tag records, emit mapper lines
//! rsjoin run --mode inner < mixed.csv
//! ```
//!
//! ## Modules
//!
//! - `tagger` - Structural classification of raw lines by column count
//! - `partition` - Deterministic join-key to bucket routing
//! - `group` - Per-bucket grouping into sorted key runs
//! - `join` - Inner and outer joining of key groups
//! - `emit` - Output seam: the `Emitter` trait and stock implementations
//! - `pipeline` - End-to-end orchestration with per-bucket workers
//! - `error` - The `JoinError` taxonomy shared by every stage
pub mod emit;
pub mod error;
pub mod group;
pub mod join;
pub mod partition;
pub mod pipeline;
pub mod tagger;
pub mod types;
