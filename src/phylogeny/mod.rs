//! The working [`Phylogeny`] arena, converted from and back into the nested [`TreeNode`] document.

use crate::auspice::{BranchAttrs, NodeAttr, NodeAttrs, TreeNode};
use crate::placement::PlacementError;
use crate::sequence::{Sample, Substitution};
use color_eyre::eyre::{eyre, Report, Result};
use graft_phylo::Phylogeny;
use log::debug;
use petgraph::graph::NodeIndex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Suffix appended to a sample name to name its new leaf.
pub const NEW_NODE_SUFFIX: &str = "_clades";

/// The working tree: [`Node`]s connected by branches weighted by their number of substitutions.
pub type Tree = Phylogeny<Node, usize>;

// ----------------------------------------------------------------------------
// Node

/// A [`Node`] of the working [`Tree`], a [`TreeNode`] without its children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub name: String,
    /// Nucleotide substitutions on the branch leading into this node.
    ///
    /// [`None`] when the document had no nucleotide mutation list for this branch.
    pub substitutions: Option<Vec<Substitution>>,
    /// Branch attributes other than the nucleotide substitutions.
    pub branch_attrs: BranchAttrs,
    pub node_attrs: NodeAttrs,
    pub other: Map<String, Value>,
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl TryFrom<&TreeNode> for Node {
    type Error = PlacementError;

    /// Returns a [`Node`] from a [`TreeNode`], parsing its nucleotide mutation tokens.
    ///
    /// ```rust
    /// use graft::auspice::TreeNode;
    /// use graft::phylogeny::Node;
    ///
    /// let mut tree_node = TreeNode { name: "A".to_string(), ..Default::default() };
    /// tree_node.branch_attrs.mutations.nuc = Some(vec!["C241T".to_string()]);
    /// let node = Node::try_from(&tree_node)?;
    /// assert_eq!(node.branch_length(), 1);
    /// assert_eq!(node.branch_attrs.mutations.nuc, None);
    ///
    /// tree_node.branch_attrs.mutations.nuc = Some(vec!["C241".to_string()]);
    /// assert!(Node::try_from(&tree_node).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn try_from(tree_node: &TreeNode) -> Result<Self, Self::Error> {
        let mut branch_attrs = tree_node.branch_attrs.clone();
        let substitutions = branch_attrs
            .mutations
            .nuc
            .take()
            .map(|tokens| {
                tokens
                    .iter()
                    .map(|token| {
                        token.parse::<Substitution>().map_err(|_| PlacementError::InvalidMutation {
                            mutation: token.clone(),
                            node: tree_node.name.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(Node {
            name: tree_node.name.clone(),
            substitutions,
            branch_attrs,
            node_attrs: tree_node.node_attrs.clone(),
            other: tree_node.other.clone(),
        })
    }
}

impl Node {
    /// Returns a new leaf [`Node`] representing a placed [`Sample`].
    ///
    /// ```rust
    /// use graft::phylogeny::Node;
    /// use graft::sequence::{Sample, Substitution};
    ///
    /// let sample = Sample { clade: "20A".to_string(), qc_status: "good".to_string(), ..Sample::new("s1") };
    /// let subs = vec![Substitution { coord: 0, reference: 'A', alt: 'C' }];
    /// let node = Node::from_sample(&sample, subs, 3.0);
    /// assert_eq!(node.name, "s1_clades");
    /// assert_eq!(node.divergence(), 3.0);
    /// assert_eq!(node.node_attrs.new_node.map(|a| a.value), Some("Yes".into()));
    /// ```
    pub fn from_sample(sample: &Sample, substitutions: Vec<Substitution>, divergence: f64) -> Self {
        let node_attrs = NodeAttrs {
            div: Some(divergence),
            clade_membership: Some(NodeAttr::from(sample.clade.as_str())),
            new_node: Some(NodeAttr::from("Yes")),
            qc_status: Some(NodeAttr::from(sample.qc_status.as_str())),
            other: Map::new(),
        };
        Node {
            name: format!("{}{NEW_NODE_SUFFIX}", sample.name),
            substitutions: Some(substitutions),
            branch_attrs: BranchAttrs::default(),
            node_attrs,
            other: Map::new(),
        }
    }

    /// Returns the number of substitutions on the branch leading into this node.
    pub fn branch_length(&self) -> usize {
        self.substitutions.as_ref().map_or(0, Vec::len)
    }

    /// Returns the divergence from the root, 0 when the document did not record one.
    pub fn divergence(&self) -> f64 {
        self.node_attrs.div.unwrap_or(0.0)
    }

    /// Returns the [`TreeNode`] of this node with the given children.
    fn to_tree_node(&self, children: Vec<TreeNode>) -> TreeNode {
        let mut branch_attrs = self.branch_attrs.clone();
        branch_attrs.mutations.nuc = self
            .substitutions
            .as_ref()
            .map(|subs| subs.iter().map(Substitution::to_string).collect());
        TreeNode {
            name: self.name.clone(),
            branch_attrs,
            node_attrs: self.node_attrs.clone(),
            children: (!children.is_empty()).then_some(children),
            other: self.other.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Conversion

/// Returns a working [`Tree`] built from the root of a nested [`TreeNode`] document.
///
/// ```rust
/// use graft::auspice::TreeNode;
/// use graft::phylogeny;
///
/// let leaf = |name: &str| TreeNode { name: name.to_string(), ..Default::default() };
/// let root = TreeNode { children: Some(vec![leaf("A"), leaf("B")]), ..leaf("root") };
///
/// let tree = phylogeny::from_auspice(&root)?;
/// let names: Vec<_> = tree.get_nodes()?.iter().map(|n| n.name.as_str()).collect();
/// assert_eq!(names, ["root", "A", "B"]);
/// assert_eq!(phylogeny::to_auspice(&tree)?, root);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn from_auspice(root: &TreeNode) -> Result<Tree, Report> {
    let mut tree = Tree::new();
    let root_index = tree.add_node(Node::try_from(root)?);

    // depth-first, children pushed in reverse so that they are added in document order
    let mut stack: Vec<(NodeIndex, &TreeNode)> =
        root.children.iter().flatten().rev().map(|child| (root_index, child)).collect();
    while let Some((parent, tree_node)) = stack.pop() {
        let node = Node::try_from(tree_node)?;
        let branch = node.branch_length();
        let index = tree.add_child(parent, node, branch)?;
        stack.extend(tree_node.children.iter().flatten().rev().map(|child| (index, child)));
    }

    debug!("Converted tree document into phylogeny with {} nodes.", tree.len());
    Ok(tree)
}

/// Returns the nested [`TreeNode`] document of a working [`Tree`].
///
/// Nodes are built from the leaves up, without recursion.
pub fn to_auspice(tree: &Tree) -> Result<TreeNode, Report> {
    let mut built: HashMap<NodeIndex, TreeNode> = HashMap::with_capacity(tree.len());
    let preorder = tree.preorder()?;

    // reverse preorder visits every child before its parent
    for &index in preorder.iter().rev() {
        let children = tree
            .get_children(index)?
            .into_iter()
            .map(|child| {
                built.remove(&child).ok_or_else(|| eyre!("Child index {child:?} was not converted."))
            })
            .collect::<Result<Vec<_>, Report>>()?;
        built.insert(index, tree.get_node(index)?.to_tree_node(children));
    }

    let root = tree.get_root_index()?;
    built.remove(&root).ok_or_else(|| eyre!("Root index {root:?} was not converted."))
}
