//! # veil-observability
//!
//! Structured tracing for the mapping store: subscriber setup driven by
//! `VEIL_LOG`, span macros per operation, and one event function per notable
//! occurrence. Events carry scopes, categories and substitutes, never originals.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, init_tracing_with_filter};
