//! quarry-lib: Core types and logic for Quarry
//!
//! This crate is the dependency-resolution core of the build tool:
//! - `target`/`rule`: identifiers and rule data shared by everything else
//! - `parser`: the incremental rule index and parse cache
//! - `resolve`: the cycle-checked traversal producing the dependency DAG
//! - `eval`: the Lua declaration-file evaluator behind the parser
//! - `cache`: layered artifact caching with fallback and backfill
//! - `watch`: filesystem change events consumed by the parser

pub mod cache;
pub mod consts;
pub mod eval;
pub mod parser;
pub mod resolve;
pub mod rule;
pub mod target;
pub mod tree;
pub mod watch;
