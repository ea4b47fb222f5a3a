//! ColumnDB - A lightweight single-node column-store database engine implemented in Rust
//!
//! This crate provides the core functionality for a column-store database
//! engine: chunked in-memory table storage with per-chunk range statistics,
//! a logical plan representation, and a rule-based query optimizer that
//! performs static chunk pruning across equi-join graphs.

pub mod common;
pub mod config;
pub mod core;
pub mod query;
pub mod storage;
