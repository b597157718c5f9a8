//! The [Auspice](https://docs.nextstrain.org/projects/auspice/) JSON tree document.
//!
//! Only the fields that placement reads or writes are typed. Everything else, at every level
//! of the document, is kept in an `other` map and written back unchanged.

use crate::utils;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use strum::{Display, EnumIter, EnumString};

// ----------------------------------------------------------------------------
// Format Version

/// Known versions of the tree document format.
///
/// ```rust
/// use graft::auspice::FormatVersion;
/// use std::str::FromStr;
///
/// assert_eq!(FormatVersion::from_str("v2")?, FormatVersion::V2);
/// assert_eq!(FormatVersion::V2.to_string(), "v2");
/// assert!(FormatVersion::from_str("v1").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Display, EnumIter, EnumString, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum FormatVersion {
    #[default]
    V2,
}

// ----------------------------------------------------------------------------
// Auspice Tree

/// An Auspice tree document: `version`, `meta`, and the root of the `tree`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AuspiceTree {
    /// Kept as raw JSON, so that an unexpected version is reported as an unknown format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeNode>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl AuspiceTree {
    /// Read an [`AuspiceTree`] from a JSON file (optionally `.zst` compressed).
    ///
    /// Trees are nested one object per node, so the recursion limit of the JSON parser is lifted
    /// and the stack grows on demand.
    ///
    /// ```rust
    /// use graft::auspice::AuspiceTree;
    ///
    /// let tree = AuspiceTree { version: Some("v2".into()), ..Default::default() };
    /// let file = tempfile::Builder::new().suffix(".json").tempfile()?;
    /// tree.write(&file.path())?;
    /// assert_eq!(AuspiceTree::read(&file.path())?, tree);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read<P>(path: &P) -> Result<AuspiceTree, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let text = utils::read_to_string(path)?;
        let tree = AuspiceTree::from_json(&text)
            .wrap_err_with(|| eyre!("Failed to parse tree document: {path:?}"))
            .suggestion("Is this an Auspice v2 JSON tree?")?;
        Ok(tree)
    }

    /// Parse an [`AuspiceTree`] from JSON text, of any depth.
    ///
    /// ```rust
    /// use graft::auspice::AuspiceTree;
    ///
    /// let mut json = String::from(r#"{"name": "n0""#);
    /// for i in 1..300 {
    ///     json.push_str(&format!(r#", "children": [{{"name": "n{i}""#));
    /// }
    /// json.push_str(&"}]".repeat(299));
    /// json.push('}');
    ///
    /// let tree = AuspiceTree::from_json(&format!(r#"{{"version": "v2", "tree": {json}}}"#))?;
    /// assert_eq!(tree.tree.map(|root| root.name), Some("n0".to_string()));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_json(text: &str) -> Result<AuspiceTree, serde_json::Error> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        deserializer.disable_recursion_limit();
        let mut value = Value::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
        deserializer.end()?;

        // the nested tree is converted without recursion, the rest of the document is shallow
        let root = value
            .as_object_mut()
            .and_then(|document| document.remove("tree"))
            .filter(|root| !root.is_null());
        let mut tree: AuspiceTree = serde_json::from_value(value)?;
        tree.tree = root.map(TreeNode::from_value).transpose()?;
        Ok(tree)
    }

    /// Write the [`AuspiceTree`] to a pretty-printed JSON file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut value = serde_json::to_value(self.clone_shallow())
            .wrap_err("Failed to serialize tree document.")?;
        if let (Some(root), Some(document)) = (&self.tree, value.as_object_mut()) {
            let root = root.to_value().wrap_err("Failed to serialize tree document.")?;
            document.insert(String::from("tree"), root);
        }

        let mut output = Vec::new();
        let mut serializer = serde_json::Serializer::pretty(&mut output);
        value
            .serialize(serde_stacker::Serializer::new(&mut serializer))
            .wrap_err("Failed to serialize tree document.")?;
        output.push(b'\n');

        let mut file =
            File::create(path).wrap_err_with(|| eyre!("Failed to create tree file: {path:?}"))?;
        file.write_all(&output).wrap_err_with(|| eyre!("Failed to write tree file: {path:?}"))?;
        Ok(())
    }

    /// Returns a copy of the document without its tree.
    fn clone_shallow(&self) -> AuspiceTree {
        AuspiceTree {
            version: self.version.clone(),
            meta: self.meta.clone(),
            tree: None,
            other: self.other.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Meta

/// Document metadata, of which placement only touches the legend and the display defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Meta {
    #[serde(default)]
    pub colorings: Vec<Coloring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_defaults: Option<DisplayDefaults>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A legend entry that nodes can be colored by.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Coloring {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub coloring_type: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Coloring {
    /// Returns a categorical [`Coloring`].
    ///
    /// ```rust
    /// use graft::auspice::Coloring;
    /// let coloring = Coloring::categorical("new_node", "New Node");
    /// let json = serde_json::to_string(&coloring)?;
    /// assert_eq!(json, r#"{"key":"new_node","title":"New Node","type":"categorical"}"#);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn categorical(key: &str, title: &str) -> Self {
        Coloring {
            key: key.to_string(),
            title: Some(title.to_string()),
            coloring_type: Some(String::from("categorical")),
            other: Map::new(),
        }
    }
}

/// Default view settings of the tree visualization.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DisplayDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_measure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_triplicate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission_lines: Option<bool>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

// ----------------------------------------------------------------------------
// Tree Node

/// A node of the nested tree, owning its `children`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "BranchAttrs::is_empty")]
    pub branch_attrs: BranchAttrs,
    #[serde(default, skip_serializing_if = "NodeAttrs::is_empty")]
    pub node_attrs: NodeAttrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TreeNode {
    /// Returns a copy of the node without its children.
    fn clone_shallow(&self) -> TreeNode {
        TreeNode {
            name: self.name.clone(),
            branch_attrs: self.branch_attrs.clone(),
            node_attrs: self.node_attrs.clone(),
            children: None,
            other: self.other.clone(),
        }
    }

    /// Converts a JSON tree into a [`TreeNode`] one node at a time, so that depth is only limited
    /// by memory.
    pub fn from_value(root: Value) -> Result<TreeNode, serde_json::Error> {
        // flatten in preorder, each node with the position of its parent
        let mut nodes: Vec<(Option<usize>, TreeNode)> = Vec::new();
        let mut stack = vec![(None, root)];
        while let Some((parent, mut value)) = stack.pop() {
            let children = value.as_object_mut().and_then(|node| node.remove("children"));
            let mut node: TreeNode = serde_json::from_value(value)?;
            let children = match children {
                None | Some(Value::Null) => None,
                Some(children) => Some(serde_json::from_value::<Vec<Value>>(children)?),
            };
            let index = nodes.len();
            if let Some(children) = children {
                node.children = Some(Vec::with_capacity(children.len()));
                stack.extend(children.into_iter().rev().map(|child| (Some(index), child)));
            }
            nodes.push((parent, node));
        }

        // descendants come after their ancestors, so attach from the back
        while let Some((parent, mut node)) = nodes.pop() {
            // children were attached last to first
            if let Some(children) = node.children.as_mut() {
                children.reverse();
            }
            match parent {
                Some(parent) => nodes[parent].1.children.get_or_insert_with(Vec::new).push(node),
                None => return Ok(node),
            }
        }
        Err(serde::de::Error::custom("tree has no root node"))
    }

    /// Converts a [`TreeNode`] into a JSON tree one node at a time.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut nodes: Vec<(Option<usize>, &TreeNode)> = Vec::new();
        let mut stack = vec![(None, self)];
        while let Some((parent, node)) = stack.pop() {
            let index = nodes.len();
            nodes.push((parent, node));
            stack.extend(node.children.iter().flatten().rev().map(|child| (Some(index), child)));
        }

        let mut children: Vec<Vec<Value>> = vec![Vec::new(); nodes.len()];
        while let Some((parent, node)) = nodes.pop() {
            let mut value = serde_json::to_value(node.clone_shallow())?;
            if let (Some(_), Some(object)) = (&node.children, value.as_object_mut()) {
                let mut node_children = std::mem::take(&mut children[nodes.len()]);
                node_children.reverse();
                object.insert(String::from("children"), Value::Array(node_children));
            }
            match parent {
                Some(parent) => children[parent].push(value),
                None => return Ok(value),
            }
        }
        Err(serde::ser::Error::custom("tree has no root node"))
    }
}

/// Attributes of the branch leading into a [`TreeNode`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BranchAttrs {
    #[serde(default, skip_serializing_if = "BranchMutations::is_empty")]
    pub mutations: BranchMutations,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl BranchAttrs {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.other.is_empty()
    }
}

/// Mutations on a branch: nucleotide tokens under `nuc`, amino acid tokens keyed by gene in `other`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BranchMutations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nuc: Option<Vec<String>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl BranchMutations {
    pub fn is_empty(&self) -> bool {
        self.nuc.is_none() && self.other.is_empty()
    }
}

/// Attributes of a [`TreeNode`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct NodeAttrs {
    /// Divergence, the cumulative number of mutations from the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub div: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clade_membership: Option<NodeAttr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_node: Option<NodeAttr>,
    #[serde(rename = "QCStatus", default, skip_serializing_if = "Option::is_none")]
    pub qc_status: Option<NodeAttr>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl NodeAttrs {
    pub fn is_empty(&self) -> bool {
        self.div.is_none()
            && self.clade_membership.is_none()
            && self.new_node.is_none()
            && self.qc_status.is_none()
            && self.other.is_empty()
    }
}

/// A single `{"value": ...}` node attribute.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct NodeAttr {
    pub value: Value,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl From<&str> for NodeAttr {
    fn from(value: &str) -> Self {
        NodeAttr { value: Value::String(value.to_string()), other: Map::new() }
    }
}
