use crate::phylogeny::Tree;
use crate::placement::{distance, AncestralStates};
use crate::sequence::Sample;
use color_eyre::eyre::{eyre, Report, Result};
use petgraph::graph::NodeIndex;

/// The node of a [`Tree`] closest to a [`Sample`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Nearest {
    pub distance: usize,
    pub node: NodeIndex,
}

/// Searches the whole [`Tree`] for the node with the smallest [`distance`] to the [`Sample`].
///
/// Nodes are visited in preorder (root first, then children in order) and a node only replaces
/// the current best if it is strictly closer, so ties go to the first node visited.
///
/// ```rust
/// use graft::auspice::TreeNode;
/// use graft::phylogeny;
/// use graft::placement::{find_nearest, AncestralStates};
/// use graft::sequence::Sample;
///
/// let mut root = TreeNode { name: "root".to_string(), ..Default::default() };
/// let mut child = TreeNode { name: "A".to_string(), ..Default::default() };
/// child.branch_attrs.mutations.nuc = Some(vec!["A1C".to_string()]);
/// root.children = Some(vec![child]);
///
/// let tree = phylogeny::from_auspice(&root)?;
/// let states = AncestralStates::accumulate(&tree)?;
///
/// let sample = Sample { mutations: vec!["A1C".parse()?], ..Sample::new("s1") };
/// let nearest = find_nearest(&tree, &states, &sample)?;
/// assert_eq!(tree.get_node(nearest.node)?.name, "A");
/// assert_eq!(nearest.distance, 0);
///
/// // equally close to everything, the root wins
/// let sample = Sample::new("s2");
/// let nearest = find_nearest(&tree, &states, &sample)?;
/// assert_eq!(nearest.node, tree.get_root_index()?);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn find_nearest(tree: &Tree, states: &AncestralStates, sample: &Sample) -> Result<Nearest, Report> {
    let genotype = sample.genotype();
    let mut best: Option<Nearest> = None;
    for node in tree.preorder()? {
        let distance = distance(states.get(node)?, &genotype);
        if best.map_or(true, |best| distance < best.distance) {
            best = Some(Nearest { distance, node });
        }
    }
    best.ok_or_else(|| eyre!("Failed to find a nearest node for sample {}, the tree is empty.", sample.name))
}
