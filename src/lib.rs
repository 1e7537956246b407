//! Petal analysis for periodic hydrogen-bond networks.
//!
//! A node's "petal" is the union of all short rings passing through it.
//! The crate enumerates those rings, classifies every petal by its exact
//! isomorphism class against a durable registry of known shapes, and
//! reports the result as JSON or as a ranked yaplot drawing.

use petgraph::graph::UnGraph;

pub mod cell;

mod canon;
pub use canon::*;

mod config;
pub use config::*;

mod lattice;
pub use lattice::*;

mod petal;
pub use petal::*;

mod registry;
pub use registry::*;

mod report;
pub use report::*;

mod rings;
pub use rings::*;

pub mod yaplot;

/// Hydrogen-bond network over molecule indices 0..n.
pub type HydrogenBondGraph = UnGraph<(), ()>;

/// A petal subgraph. Node weights carry the original molecule index;
/// classification ignores them.
pub type PetalGraph = UnGraph<usize, ()>;

/// Identifier a registry assigns to one isomorphism class, starting at 0.
pub type ClassId = u32;

/// Installs a stderr logger honoring `RUST_LOG`, falling back to the
/// given level. Stdout stays reserved for the report payload.
pub fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
