//! Phylogenetic placement of [samples](Sample) onto an [Auspice tree](AuspiceTree).
//!
//! Every node's full genome is [accumulated](AncestralStates::accumulate) from the root, each sample
//! is compared against every node by [`distance`], and attached as a new leaf under the
//! [nearest](find_nearest) node by [`attach`].

pub mod attach;
pub mod distance;
pub mod search;
pub mod state;
pub mod summary;
#[cfg(test)]
mod tests;

#[doc(inline)]
pub use attach::{attach, private_substitutions};
#[doc(inline)]
pub use distance::distance;
#[doc(inline)]
pub use search::{find_nearest, Nearest};
#[doc(inline)]
pub use state::AncestralStates;
#[doc(inline)]
pub use summary::{PlacementRecord, PlacementSummary, Status};

use crate::auspice::{AuspiceTree, Coloring, DisplayDefaults, FormatVersion, Meta};
use crate::phylogeny::{self, Tree};
use crate::sequence::{Reference, Sample};
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use log::{debug, info};
use serde_json::{Map, Value};
use std::str::FromStr;
use strum::IntoEnumIterator;
use thiserror::Error;

// ----------------------------------------------------------------------------
// Placement Error

/// Fatal conditions of a placement run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("Tree format not recognized. Expected version {expected}, got {found}.")]
    UnknownVersion { expected: String, found: String },
    #[error("Tree format not recognized. \".tree\" is undefined.")]
    MissingRoot,
    #[error("Unable to parse mutation {mutation:?} on the branch leading to node {node:?}.")]
    InvalidMutation { mutation: String, node: String },
    #[error("Inconsistent mutation {mutation} on the branch leading to node {node:?}: ancestral base is {claimed}, but the inherited state at this position is {previous}.")]
    InconsistentMutation { mutation: String, node: String, claimed: char, previous: char },
    #[error("Sample {sample:?} has a mutation at position {position}, outside of the reference sequence of length {length}.")]
    OutsideReference { sample: String, position: usize, length: usize },
}

// ----------------------------------------------------------------------------
// Placement

/// The result of a placement run.
#[derive(Clone, Debug)]
pub struct Placement {
    /// The decorated tree document, with a new leaf for every placed sample.
    pub tree: AuspiceTree,
    /// The working tree the document was rebuilt from.
    pub phylogeny: Tree,
    pub summary: PlacementSummary,
}

/// Places every sample without errors onto a copy of the tree `document`.
///
/// Samples are placed in input order, so a later sample can be attached to the leaf of an earlier
/// one. The caller's document and samples are never modified.
///
/// ```rust
/// use graft::auspice::AuspiceTree;
/// use graft::locate_in_tree;
/// use graft::sequence::{Reference, Sample};
///
/// let json = r#"{
///   "version": "v2",
///   "meta": {},
///   "tree": {"name": "root", "children": [{"name": "A", "branch_attrs": {"mutations": {"nuc": ["A1C"]}}}]}
/// }"#;
/// let document: AuspiceTree = serde_json::from_str(json)?;
/// let reference: Reference = "ACGT".parse()?;
/// let sample = Sample { mutations: vec!["A1C".parse()?, "G3T".parse()?], ..Sample::new("s1") };
///
/// let placement = locate_in_tree(&[sample], &document, &reference)?;
/// let record = &placement.summary.records[0];
/// assert_eq!(record.attached_to.as_deref(), Some("A"));
/// assert_eq!(record.distance, Some(1));
///
/// let root = placement.tree.tree.as_ref().unwrap();
/// let leaf = &root.children.as_ref().unwrap()[0].children.as_ref().unwrap()[0];
/// assert_eq!(leaf.name, "s1_clades");
/// assert_eq!(leaf.branch_attrs.mutations.nuc, Some(vec!["G3T".to_string()]));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn locate_in_tree(
    samples: &[Sample],
    document: &AuspiceTree,
    reference: &Reference,
) -> Result<Placement, Report> {
    // ------------------------------------------------------------------------
    // Validate

    validate_version(document.version.as_ref())?;
    let root = document.tree.as_ref().ok_or(PlacementError::MissingRoot)?;
    let mut tree = phylogeny::from_auspice(root)?;
    info!("Placing {} sample(s) onto a tree of {} nodes.", samples.len(), tree.len());

    // ------------------------------------------------------------------------
    // Accumulate

    let mut states = AncestralStates::accumulate(&tree)?;

    // ------------------------------------------------------------------------
    // Place

    let mut summary = PlacementSummary::new();
    for sample in samples {
        if !sample.is_placeable() {
            debug!("Skipping sample {} with errors: {}", sample.name, sample.errors.iter().join("; "));
            summary.records.push(PlacementRecord::skipped(&sample.name));
            continue;
        }

        let nearest = find_nearest(&tree, &states, sample)?;
        let leaf = attach(&mut tree, &mut states, nearest.node, sample, reference)?;

        summary.records.push(PlacementRecord {
            sample: sample.name.clone(),
            status: Status::Placed,
            attached_to: Some(tree.get_node(nearest.node)?.name.clone()),
            distance: Some(nearest.distance),
            private_substitutions: tree.get_node(leaf)?.substitutions.clone().unwrap_or_default(),
        });
    }

    // ------------------------------------------------------------------------
    // Clean

    drop(states);
    let mut output = AuspiceTree {
        version: document.version.clone(),
        meta: document.meta.clone(),
        tree: Some(phylogeny::to_auspice(&tree)?),
        other: document.other.clone(),
    };
    decorate(&mut output.meta);

    info!(
        "Placed {} sample(s), skipped {} sample(s) with errors.",
        summary.placed(),
        summary.skipped()
    );

    Ok(Placement { tree: output, phylogeny: tree, summary })
}

/// Checks that the document version is a known [`FormatVersion`].
///
/// A missing version is reported as `undefined`, and a version that is not a string by its JSON text.
fn validate_version(version: Option<&Value>) -> Result<FormatVersion, PlacementError> {
    let found = match version {
        None => String::from("undefined"),
        Some(Value::String(version)) => version.clone(),
        Some(version) => version.to_string(),
    };
    FormatVersion::from_str(&found).map_err(|_| PlacementError::UnknownVersion {
        expected: FormatVersion::iter().join(", "),
        found,
    })
}

/// Appends the new node legends and replaces the display defaults.
///
/// Legends are appended even if they are already present.
fn decorate(meta: &mut Meta) {
    meta.colorings.push(Coloring::categorical("QCStatus", "QC Status"));
    meta.colorings.push(Coloring::categorical("new_node", "New Node"));
    meta.display_defaults = Some(DisplayDefaults {
        branch_label: Some(String::from("clade")),
        color_by: Some(String::from("new_node")),
        distance_measure: Some(String::from("div")),
        geo_resolution: Some(String::from("country")),
        map_triplicate: Some(true),
        transmission_lines: Some(false),
        other: Map::new(),
    });
}
