//! Purpose: Library crate for the JSON representation engine used by the `repr` CLI.
//! Exports: `api` (stable surface), `core` (types, values, classes, codecs, errors).
//! Role: Resolves one memoized codec per fully parameterized type and runs it over JSON.
//! Invariants: Registries are explicit values; the crate holds no global state.
//! Invariants: Every resolved representation is immutable and shareable across threads.
pub mod api;
pub mod core;
