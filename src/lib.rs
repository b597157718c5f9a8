//! `graft` places newly sequenced samples onto a reference phylogeny.
//!
//! ## How it works
//!
//! 1. The tree is read from an [Auspice](https://docs.nextstrain.org/projects/auspice/) v2 JSON
//!    document, where every branch lists the nucleotide substitutions that separate a node from
//!    its parent.
//! 1. The full genome of every node, relative to the reference, is accumulated from the root down.
//! 1. Each sample, described by its own substitutions relative to the reference, is compared
//!    against every node. It is attached as a new leaf under the closest one, carrying only the
//!    substitutions that separate it from that node.
//!
//! Samples are placed in order, so a later sample can land on the leaf of an earlier one.
//!
//! ```rust
//! use graft::auspice::AuspiceTree;
//! use graft::sequence::{Reference, Sample};
//!
//! let json = r#"{"version": "v2", "meta": {}, "tree": {"name": "root"}}"#;
//! let document: AuspiceTree = serde_json::from_str(json)?;
//! let reference: Reference = "ACGT".parse()?;
//! let samples = [Sample { mutations: vec!["A1C".parse()?], ..Sample::new("s1") }];
//!
//! let placement = graft::locate_in_tree(&samples, &document, &reference)?;
//! assert_eq!(placement.summary.placed(), 1);
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```

pub mod auspice;
pub mod cli;
pub mod phylogeny;
pub mod placement;
pub mod run;
pub mod sequence;
pub mod utils;

#[doc(inline)]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::placement::{locate_in_tree, Placement, PlacementError};
#[doc(inline)]
pub use utils::table::Table;
#[doc(inline)]
pub use utils::verbosity::Verbosity;
