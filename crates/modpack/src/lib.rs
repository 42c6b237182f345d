//! modpack: bundles a graph of JavaScript modules into one self-executing script
//!
//! The pipeline is [`graph_builder`] (discover and load every module reachable
//! from the entry), [`emitter`] (flatten the graph into an id-indexed table)
//! and [`render`] (write the table plus a small module runtime). The
//! [`runtime`] module executes tables of native payloads in-process with the
//! same module semantics.

pub mod config;
pub mod dirs;
pub mod emitter;
pub mod error;
pub mod front_end;
pub mod graph;
pub mod graph_builder;
pub mod loader;
pub mod orchestrator;
pub mod render;
pub mod resolver;
pub mod runtime;
pub mod types;
