//! A rooted, ordered [`Phylogeny`] stored as an arena of nodes and branches.
//!
//! Nodes are addressed by their [`NodeIndex`](petgraph::graph::NodeIndex), which stays
//! stable while new children are attached, so callers can keep per-node data in
//! side tables keyed by index.

use color_eyre::eyre::{Report, Result};

pub mod newick;
mod phylogeny;

#[doc(inline)]
pub use phylogeny::Phylogeny;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Returns a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`str`] created from an object.
pub trait ToNewick {
    fn to_newick(&self) -> Result<String, Report>;
}
