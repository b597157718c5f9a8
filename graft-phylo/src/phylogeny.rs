use crate::{newick, ToNewick};

use color_eyre::eyre::{eyre, Report, Result};
use num_traits::AsPrimitive;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeReference, Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Display};

/// A rooted and ordered [`Phylogeny`].
///
/// ## Introduction
///
/// - The nodes (`N`) can be a wide variety of types (ex. [`str`], [`String`], or a custom struct).
/// - The branches (`B`) must be a type that can be cast into an [`f32`] for the length.
/// - Every node has at most one parent, and children keep the order they were attached in.
///
/// ```rust
/// let mut phylo = graft_phylo::Phylogeny::new();
/// let a = phylo.add_node("A");
/// let b = phylo.add_child(a, "B", 1)?;
/// let c = phylo.add_child(a, "C", 2)?;
/// let d = phylo.add_child(b, "D", 3)?;
/// # assert_eq!(phylo.preorder()?, [a, b, d, c]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
///
/// ```mermaid
/// graph LR;
///   A-->|1|B;
///   A-->|2|C;
///   B-->|3|D;
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Phylogeny<N, B> {
    /// Directed graph of parents and children.
    ///
    /// `N` are nodes and `B` are the branches leading into each child.
    pub graph: Graph<N, B>,
}

impl<N, B> Default for Phylogeny<N, B>
where
    N: Debug + Display,
    B: AsPrimitive<f32> + Debug + Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, B> Phylogeny<N, B>
where
    N: Debug + Display,
    B: AsPrimitive<f32> + Debug + Display,
{
    /// Returns a new empty [`Phylogeny`] with nodes (`N`) and branches (`B`).
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use graft_phylo::Phylogeny;
    /// let phylo: Phylogeny<&str, usize> = Phylogeny::new();
    /// assert!(phylo.is_empty());
    /// ```
    pub fn new() -> Self {
        Phylogeny { graph: Graph::new() }
    }

    /// Adds a new unconnected node (`N`) to the [`Phylogeny`] and returns its [`NodeIndex`].
    ///
    /// Nodes are identified by index, so two nodes may carry equal data.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use graft_phylo::Phylogeny;
    /// use petgraph::graph::NodeIndex;
    ///
    /// let mut phylo: Phylogeny<&str, usize> = Phylogeny::new();
    /// assert_eq!(phylo.add_node("A"), NodeIndex::new(0));
    /// assert_eq!(phylo.add_node("A"), NodeIndex::new(1));
    /// ```
    pub fn add_node(&mut self, node: N) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Creates a new child node (`N`) under `parent`, connected by `branch` (`B`).
    ///
    /// The child becomes the last child of `parent`.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// let b = phylo.add_child(a, "B", 1)?;
    /// let c = phylo.add_child(a, "C", 1)?;
    /// assert_eq!(phylo.get_children(a)?, [b, c]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// The parent must already be in the phylogeny.
    ///
    /// ```rust
    /// # use petgraph::graph::NodeIndex;
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// assert!(phylo.add_child(NodeIndex::new(5), "B", 1).is_err());
    /// ```
    pub fn add_child(&mut self, parent: NodeIndex, node: N, branch: B) -> Result<NodeIndex, Report> {
        if self.graph.node_weight(parent).is_none() {
            Err(eyre!("Failed to add child {node}, parent index {parent:?} is not in phylogeny."))?
        }
        let child = self.graph.add_node(node);
        self.graph.add_edge(parent, child, branch);
        Ok(child)
    }

    /// Returns the branch (`B`) leading into `node` from its parent.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// let b = phylo.add_child(a, "B", 7)?;
    /// assert_eq!(phylo.get_branch(b)?, &7);
    /// assert!(phylo.get_branch(a).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_branch(&self, node: NodeIndex) -> Result<&B, Report> {
        let edge = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .next()
            .ok_or_else(|| eyre!("Failed to get branch leading into node index {node:?}"))?;
        Ok(edge.weight())
    }

    /// Returns the immediate children of `node`, in the order they were attached.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// let b = phylo.add_child(a, "B", 1)?;
    /// let c = phylo.add_child(a, "C", 1)?;
    /// let d = phylo.add_child(a, "D", 1)?;
    /// assert_eq!(phylo.get_children(a)?, [b, c, d]);
    /// assert!(phylo.get_children(b)?.is_empty());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_children(&self, node: NodeIndex) -> Result<Vec<NodeIndex>, Report> {
        self.get_node(node)?;
        let mut children: Vec<_> = self.graph.neighbors_directed(node, Direction::Outgoing).collect();
        // children order is last added to first added, reverse this
        children.reverse();
        Ok(children)
    }

    /// Returns the node (`N`) that corresponds to the [`NodeIndex`].
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// let b = phylo.add_child(a, "B", 1)?;
    /// assert_eq!(phylo.get_node(b)?, &"B");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_node(&self, node: NodeIndex) -> Result<&N, Report> {
        self.graph
            .node_weight(node)
            .ok_or_else(|| eyre!("Failed to get node data for node index {node:?}"))
    }

    /// Returns all nodes (`N`) in the [`Phylogeny`], in [preorder](Phylogeny::preorder).
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// let b = phylo.add_child(a, "B", 1)?;
    /// phylo.add_child(a, "C", 1)?;
    /// phylo.add_child(b, "D", 1)?;
    /// assert_eq!(phylo.get_nodes()?, [&"A", &"B", &"D", &"C"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_nodes(&self) -> Result<Vec<&N>, Report> {
        self.preorder()?.into_iter().map(|i| self.get_node(i)).collect()
    }

    /// Returns the parent of `node`, or [`None`] for the root.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// let b = phylo.add_child(a, "B", 1)?;
    /// assert_eq!(phylo.get_parent(b)?, Some(a));
    /// assert_eq!(phylo.get_parent(a)?, None);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_parent(&self, node: NodeIndex) -> Result<Option<NodeIndex>, Report> {
        self.get_node(node)?;
        Ok(self.graph.neighbors_directed(node, Direction::Incoming).next())
    }

    /// Returns the [`NodeIndex`] of the single node without a parent.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use graft_phylo::Phylogeny;
    /// let mut phylo: Phylogeny<&str, usize> = Phylogeny::new();
    /// assert!(phylo.get_root_index().is_err());
    ///
    /// let a = phylo.add_node("A");
    /// phylo.add_child(a, "B", 1)?;
    /// assert_eq!(phylo.get_root_index()?, a);
    ///
    /// // a second parentless node makes the root ambiguous
    /// phylo.add_node("X");
    /// assert!(phylo.get_root_index().is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_root_index(&self) -> Result<NodeIndex, Report> {
        if self.is_empty() {
            Err(eyre!("Failed to locate root node index in phylogeny as graph is empty!."))?
        }

        // get all nodes with no parents, could be root
        let root_indices: Vec<_> = self
            .graph
            .node_indices()
            .filter(|i| 0 == self.graph.edges_directed(*i, Direction::Incoming).count())
            .collect();

        match root_indices.len() {
            0 => Err(eyre!("Failed to locate root node index in phylogeny."))?,
            1 => Ok(root_indices[0]),
            _ => Err(eyre!("Failed to locate root node index in phylogeny, multiple roots found: {root_indices:?}"))?
        }
    }

    /// Returns true if the [`Phylogeny`] has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns the number of nodes in the [`Phylogeny`].
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns all node indices in preorder: the root first, then each child subtree in the order
    /// the children were attached.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// let b = phylo.add_child(a, "B", 1)?;
    /// let c = phylo.add_child(a, "C", 1)?;
    /// let d = phylo.add_child(b, "D", 1)?;
    /// let e = phylo.add_child(c, "E", 1)?;
    /// let f = phylo.add_child(b, "F", 1)?;
    /// assert_eq!(phylo.preorder()?, [a, b, d, f, c, e]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn preorder(&self) -> Result<Vec<NodeIndex>, Report> {
        let root = self.get_root_index()?;
        let mut order = Vec::with_capacity(self.len());
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            order.push(node);
            // push in reverse, so that the first child is visited first
            let mut children = self.get_children(node)?;
            children.reverse();
            stack.extend(children);
        }
        Ok(order)
    }

    /// Returns the [`Phylogeny`] as a [graphviz](https://graphviz.org/) DOT string.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// phylo.add_child(a, "B", 2)?;
    /// let dot = phylo.to_dot()?;
    /// assert!(dot.contains("rankdir=\"LR\""));
    /// assert!(dot.contains("label=\"B\""));
    /// assert!(dot.contains("weight=2"));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn to_dot(&self) -> Result<String, Report> {
        let config = &[Config::NodeNoLabel, Config::EdgeNoLabel];
        let edges = |_, e: EdgeReference<'_, B>| format!("label=\"{weight}\" weight={weight}", weight = e.weight());
        let nodes = |_, (_i, node): (NodeIndex, &N)| {
            format!("label=\"{}\"", node.to_string().replace('"', "\\\""))
        };
        let dot = Dot::with_attr_getters(&self.graph, config, &edges, &nodes).to_string();

        // add direction LR
        let dot = dot.replace("digraph {", "digraph {\n    rankdir=\"LR\"");

        Ok(dot)
    }

    /// Returns the Newick text of the subtree rooted at `node`, without the trailing `;`.
    ///
    /// Clades are joined from the leaves up, without recursion.
    fn subtree_to_newick(&self, node: NodeIndex) -> Result<String, Report> {
        let mut order = vec![node];
        let mut i = 0;
        while i < order.len() {
            order.extend(self.get_children(order[i])?);
            i += 1;
        }

        // reverse breadth-first order visits every child before its parent
        let mut clades: HashMap<NodeIndex, String> = HashMap::with_capacity(order.len());
        for &index in order.iter().rev() {
            let children = self
                .get_children(index)?
                .into_iter()
                .map(|child| {
                    let clade = clades
                        .remove(&child)
                        .ok_or_else(|| eyre!("Child index {child:?} was not formatted."))?;
                    let length: f32 = self.get_branch(child)?.as_();
                    Ok(format!("{clade}:{length}"))
                })
                .collect::<Result<Vec<_>, Report>>()?;
            let label = newick::quote_label(&self.get_node(index)?.to_string());
            clades.insert(index, newick::join_clade(&children, &label));
        }

        clades.remove(&node).ok_or_else(|| eyre!("Node index {node:?} was not formatted."))
    }
}

impl<N, B> ToNewick for Phylogeny<N, B>
where
    N: Debug + Display,
    B: AsPrimitive<f32> + Debug + Display,
{
    /// Returns a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`str`] of the [`Phylogeny`].
    ///
    /// Branch lengths are the branches (`B`) cast to [`f32`].
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use graft_phylo::ToNewick;
    /// let mut phylo = graft_phylo::Phylogeny::new();
    /// let a = phylo.add_node("A");
    /// let b = phylo.add_child(a, "B", 1)?;
    /// phylo.add_child(a, "C", 2)?;
    /// phylo.add_child(b, "D", 3)?;
    /// assert_eq!(phylo.to_newick()?, "((D:3)B:1,C:2)A;");
    ///
    /// let mut chain = graft_phylo::Phylogeny::new();
    /// let mut node = chain.add_node(0);
    /// for i in 1..5_000 {
    ///     node = chain.add_child(node, i, 1)?;
    /// }
    /// let newick = chain.to_newick()?;
    /// assert!(newick.starts_with(&format!("{}4999:1)4998:1)", "(".repeat(4_999))));
    /// assert!(newick.ends_with(")1:1)0;"));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn to_newick(&self) -> Result<String, Report> {
        let root = self.get_root_index()?;
        Ok(format!("{};", self.subtree_to_newick(root)?))
    }
}
