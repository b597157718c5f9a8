use crate::phylogeny::{Node, Tree};
use crate::placement::{AncestralStates, PlacementError};
use crate::sequence::{MutationMap, Reference, Sample, Substitution};
use color_eyre::eyre::{Report, Result};
use log::debug;
use petgraph::graph::NodeIndex;

/// Returns the substitutions that separate a [`Sample`] from a node's accumulated state.
///
/// The sample is compared by its [genotype](Sample::genotype), so every coordinate yields at most
/// one substitution, in coordinate order. A coordinate the state records is only kept if the
/// sample's base differs, with the state's base as the ancestral base. At any other coordinate the
/// ancestral base is taken from the [`Reference`].
///
/// ```rust
/// use graft::placement::private_substitutions;
/// use graft::sequence::{MutationMap, Reference, Sample};
///
/// let reference: Reference = "ACGT".parse()?;
/// let state = MutationMap::from([(0, 'C'), (1, 'T')]);
/// let sample = Sample {
///     mutations: vec!["A1C".parse()?, "C2G".parse()?, "T4G".parse()?, "T4A".parse()?],
///     ..Sample::new("s1")
/// };
///
/// let subs = private_substitutions(&state, &sample, &reference)?;
/// let tokens: Vec<_> = subs.iter().map(|s| s.to_string()).collect();
/// assert_eq!(tokens, ["T2G", "T4A"]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn private_substitutions(
    state: &MutationMap,
    sample: &Sample,
    reference: &Reference,
) -> Result<Vec<Substitution>, PlacementError> {
    let mut private = Vec::new();
    for (coord, alt) in sample.genotype() {
        let ancestral = match state.get(&coord) {
            Some(base) if *base == alt => continue,
            Some(base) => *base,
            None => reference.base(coord).ok_or_else(|| PlacementError::OutsideReference {
                sample: sample.name.clone(),
                position: coord + 1,
                length: reference.len(),
            })?,
        };
        private.push(Substitution { coord, reference: ancestral, alt });
    }
    Ok(private)
}

/// Attaches a [`Sample`] as a new leaf, the last child of `parent`, and records its accumulated state.
///
/// The new leaf's branch carries the [private substitutions](private_substitutions) of the sample,
/// and its divergence is the parent's plus the number of those substitutions.
///
/// ```rust
/// use graft::auspice::TreeNode;
/// use graft::phylogeny;
/// use graft::placement::{attach, AncestralStates};
/// use graft::sequence::{Reference, Sample};
///
/// let root = TreeNode { name: "root".to_string(), ..Default::default() };
/// let mut tree = phylogeny::from_auspice(&root)?;
/// let mut states = AncestralStates::accumulate(&tree)?;
/// let reference: Reference = "ACGT".parse()?;
///
/// let sample = Sample { mutations: vec!["G3A".parse()?], ..Sample::new("s1") };
/// let root = tree.get_root_index()?;
/// let leaf = attach(&mut tree, &mut states, root, &sample, &reference)?;
///
/// assert_eq!(tree.get_children(root)?, [leaf]);
/// assert_eq!(tree.get_node(leaf)?.name, "s1_clades");
/// assert_eq!(tree.get_node(leaf)?.divergence(), 1.0);
/// assert_eq!(states.get(leaf)?.get(&2), Some(&'A'));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn attach(
    tree: &mut Tree,
    states: &mut AncestralStates,
    parent: NodeIndex,
    sample: &Sample,
    reference: &Reference,
) -> Result<NodeIndex, Report> {
    let parent_state = states.get(parent)?;
    let substitutions = private_substitutions(parent_state, sample, reference)?;

    let mut state = parent_state.clone();
    state.extend(substitutions.iter().map(|sub| (sub.coord, sub.alt)));

    let parent_node = tree.get_node(parent)?;
    debug!(
        "Attaching sample {} to node {} with {} private substitution(s).",
        sample.name,
        parent_node.name,
        substitutions.len()
    );
    let divergence = parent_node.divergence() + substitutions.len() as f64;
    let branch = substitutions.len();
    let node = Node::from_sample(sample, substitutions, divergence);

    let index = tree.add_child(parent, node, branch)?;
    states.insert(index, state);

    Ok(index)
}
