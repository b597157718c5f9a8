//! Ancestral states: the full genome of every node, relative to the reference.

use crate::phylogeny::Tree;
use crate::placement::PlacementError;
use crate::sequence::{MutationMap, Substitution};
use color_eyre::eyre::{eyre, Report, Result};
use log::debug;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// The accumulated [`MutationMap`] of every node in a [`Tree`], keyed by node index.
///
/// Lives only for the duration of one placement run, it is never written into the tree itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AncestralStates {
    states: HashMap<NodeIndex, MutationMap>,
}

impl AncestralStates {
    /// Walks the [`Tree`] from the root, accumulating the substitutions of every branch.
    ///
    /// Each node starts from its own copy of its parent's state, and the node's branch substitutions
    /// are applied in order with [`apply`].
    ///
    /// ```rust
    /// use graft::auspice::TreeNode;
    /// use graft::phylogeny;
    /// use graft::placement::AncestralStates;
    ///
    /// let mut root = TreeNode { name: "root".to_string(), ..Default::default() };
    /// let mut child = TreeNode { name: "A".to_string(), ..Default::default() };
    /// child.branch_attrs.mutations.nuc = Some(vec!["A1C".to_string(), "G3T".to_string()]);
    /// root.children = Some(vec![child]);
    ///
    /// let tree = phylogeny::from_auspice(&root)?;
    /// let states = AncestralStates::accumulate(&tree)?;
    /// let child = tree.get_children(tree.get_root_index()?)?[0];
    /// assert_eq!(states.get(child)?.get(&0), Some(&'C'));
    /// assert_eq!(states.get(child)?.get(&2), Some(&'T'));
    /// assert!(states.get(tree.get_root_index()?)?.is_empty());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn accumulate(tree: &Tree) -> Result<Self, Report> {
        let mut states = AncestralStates::default();

        // preorder guarantees that a parent state is recorded before any of its children
        for node_index in tree.preorder()? {
            let mut state = match tree.get_parent(node_index)? {
                Some(parent) => states.get(parent)?.clone(),
                None => MutationMap::new(),
            };
            let node = tree.get_node(node_index)?;
            for sub in node.substitutions.iter().flatten() {
                apply(&mut state, sub, &node.name)?;
            }
            states.insert(node_index, state);
        }

        debug!("Accumulated ancestral states for {} nodes.", states.len());
        Ok(states)
    }

    /// Returns the accumulated state of a node.
    pub fn get(&self, node: NodeIndex) -> Result<&MutationMap, Report> {
        self.states
            .get(&node)
            .ok_or_else(|| eyre!("No ancestral state was accumulated for node index {node:?}"))
    }

    pub fn insert(&mut self, node: NodeIndex, state: MutationMap) {
        self.states.insert(node, state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Applies a branch [`Substitution`] to a state, overriding the base at its coordinate.
///
/// Fails if the state already records a base at that coordinate which is not the
/// substitution's ancestral base.
///
/// ```rust
/// use graft::placement::state::apply;
/// use graft::sequence::{MutationMap, Substitution};
///
/// let mut state = MutationMap::new();
/// apply(&mut state, &"A1C".parse()?, "A")?;
/// apply(&mut state, &"C1G".parse()?, "B")?;
/// assert_eq!(state.get(&0), Some(&'G'));
///
/// // the state holds G at position 1, not T
/// assert!(apply(&mut state, &"T1A".parse()?, "C").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn apply(state: &mut MutationMap, sub: &Substitution, node: &str) -> Result<(), PlacementError> {
    if let Some(previous) = state.get(&sub.coord) {
        if *previous != sub.reference {
            return Err(PlacementError::InconsistentMutation {
                mutation: sub.to_string(),
                node: node.to_string(),
                claimed: sub.reference,
                previous: *previous,
            });
        }
    }
    state.insert(sub.coord, sub.alt);
    Ok(())
}
