use crate::auspice::{AuspiceTree, TreeNode};
use crate::phylogeny;
use crate::placement::*;
use crate::sequence::{MutationMap, Reference, Sample, Substitution};
use color_eyre::eyre::{eyre, Report, Result};
use serde_json::json;

/// Returns a v2 document with the given `tree` root.
fn document(tree: serde_json::Value) -> Result<AuspiceTree, Report> {
    let document = serde_json::from_value(json!({
        "version": "v2",
        "meta": {"title": "toy", "colorings": [{"key": "region", "type": "categorical"}]},
        "tree": tree,
    }))?;
    Ok(document)
}

/// root -> A (A1C) -> B (C1G, G3T), and root -> C (T4A)
fn toy_document() -> Result<AuspiceTree, Report> {
    document(json!({
        "name": "root",
        "node_attrs": {"div": 0},
        "children": [
            {
                "name": "A",
                "node_attrs": {"div": 1, "clade_membership": {"value": "20A"}},
                "branch_attrs": {"mutations": {"nuc": ["A1C"], "S": ["D614G"]}},
                "children": [{
                    "name": "B",
                    "node_attrs": {"div": 3},
                    "branch_attrs": {"mutations": {"nuc": ["C1G", "G3T"]}}
                }]
            },
            {
                "name": "C",
                "node_attrs": {"div": 1},
                "branch_attrs": {"mutations": {"nuc": ["T4A"]}}
            }
        ]
    }))
}

fn reference() -> Result<Reference, Report> {
    "ACGT".parse()
}

fn sample(name: &str, mutations: &[&str]) -> Result<Sample, Report> {
    let mutations = mutations.iter().map(|m| m.parse()).collect::<Result<Vec<_>, Report>>()?;
    Ok(Sample { mutations, clade: "20A".to_string(), qc_status: "good".to_string(), ..Sample::new(name) })
}

fn root(document: &AuspiceTree) -> Result<&TreeNode, Report> {
    document.tree.as_ref().ok_or_else(|| eyre!("Document has no tree."))
}

fn children(node: &TreeNode) -> &[TreeNode] {
    node.children.as_deref().unwrap_or_default()
}

fn find<'a>(node: &'a TreeNode, name: &str) -> Option<&'a TreeNode> {
    if node.name == name {
        return Some(node);
    }
    children(node).iter().find_map(|child| find(child, name))
}

fn count_nodes(node: &TreeNode) -> usize {
    1 + children(node).iter().map(count_nodes).sum::<usize>()
}

// ----------------------------------------------------------------------------
// Accumulation

#[test]
fn accumulate_applies_branch_mutations_from_root() -> Result<(), Report> {
    let document = toy_document()?;
    let tree = phylogeny::from_auspice(root(&document)?)?;
    let states = AncestralStates::accumulate(&tree)?;
    assert_eq!(states.len(), 4);

    let expected = [
        ("root", MutationMap::new()),
        ("A", MutationMap::from([(0, 'C')])),
        ("B", MutationMap::from([(0, 'G'), (2, 'T')])),
        ("C", MutationMap::from([(3, 'A')])),
    ];
    for (node_index, (name, state)) in tree.preorder()?.into_iter().zip(expected) {
        assert_eq!(tree.get_node(node_index)?.name, name);
        assert_eq!(states.get(node_index)?, &state, "state of node {name}");
    }
    Ok(())
}

#[test]
fn accumulate_rejects_inconsistent_mutation() -> Result<(), Report> {
    let document = document(json!({
        "name": "root",
        "children": [{
            "name": "A",
            "branch_attrs": {"mutations": {"nuc": ["A1C"]}},
            "children": [{"name": "B", "branch_attrs": {"mutations": {"nuc": ["T1G"]}}}]
        }]
    }))?;
    let tree = phylogeny::from_auspice(root(&document)?)?;

    let error = AncestralStates::accumulate(&tree).err().ok_or_else(|| eyre!("expected an error"))?;
    let expected = PlacementError::InconsistentMutation {
        mutation: "T1G".to_string(),
        node: "B".to_string(),
        claimed: 'T',
        previous: 'C',
    };
    assert_eq!(error.downcast_ref::<PlacementError>(), Some(&expected));
    Ok(())
}

#[test]
fn accumulate_checks_mutations_within_one_branch() -> Result<(), Report> {
    let document = document(json!({
        "name": "root",
        "children": [{"name": "A", "branch_attrs": {"mutations": {"nuc": ["A1C", "G1T"]}}}]
    }))?;
    let tree = phylogeny::from_auspice(root(&document)?)?;
    let error = AncestralStates::accumulate(&tree).err().ok_or_else(|| eyre!("expected an error"))?;
    assert!(matches!(
        error.downcast_ref::<PlacementError>(),
        Some(PlacementError::InconsistentMutation { claimed: 'G', previous: 'C', .. })
    ));
    Ok(())
}

// ----------------------------------------------------------------------------
// Distance and Search

#[test]
fn distance_of_empty_sample_is_state_size() -> Result<(), Report> {
    let state = MutationMap::from([(0, 'G'), (2, 'T'), (3, 'A')]);
    assert_eq!(distance(&state, &Sample::new("empty").genotype()), 3);
    assert_eq!(distance(&MutationMap::new(), &sample("s1", &["A1C", "C2T"])?.genotype()), 2);
    Ok(())
}

#[test]
fn distance_counts_repeated_position_once() -> Result<(), Report> {
    let state = MutationMap::from([(0, 'C')]);
    assert_eq!(distance(&state, &sample("dup", &["A1C", "A1C"])?.genotype()), 0);

    // the last base at a position wins
    assert_eq!(distance(&state, &sample("dup", &["A1G", "A1C"])?.genotype()), 0);
    assert_eq!(distance(&state, &sample("dup", &["A1C", "A1G"])?.genotype()), 1);
    assert_eq!(distance(&MutationMap::new(), &sample("dup", &["A1C", "A1G", "A1T"])?.genotype()), 1);
    Ok(())
}

#[test]
fn find_nearest_prefers_closest_node() -> Result<(), Report> {
    let document = toy_document()?;
    let tree = phylogeny::from_auspice(root(&document)?)?;
    let states = AncestralStates::accumulate(&tree)?;

    let nearest = find_nearest(&tree, &states, &sample("s1", &["A1G", "G3T", "C2A"])?)?;
    assert_eq!(tree.get_node(nearest.node)?.name, "B");
    assert_eq!(nearest.distance, 1);

    let nearest = find_nearest(&tree, &states, &sample("s2", &["T4A"])?)?;
    assert_eq!(tree.get_node(nearest.node)?.name, "C");
    assert_eq!(nearest.distance, 0);
    Ok(())
}

#[test]
fn find_nearest_breaks_ties_by_first_visited() -> Result<(), Report> {
    let document = document(json!({
        "name": "root",
        "children": [
            {"name": "A", "branch_attrs": {"mutations": {"nuc": ["A1C"]}}},
            {"name": "B", "branch_attrs": {"mutations": {"nuc": ["A1C"]}}}
        ]
    }))?;
    let tree = phylogeny::from_auspice(root(&document)?)?;
    let states = AncestralStates::accumulate(&tree)?;

    let nearest = find_nearest(&tree, &states, &sample("s1", &["A1C"])?)?;
    assert_eq!(tree.get_node(nearest.node)?.name, "A");

    // root, A and B are all at distance 1
    let nearest = find_nearest(&tree, &states, &sample("s2", &["A1T"])?)?;
    assert_eq!(nearest.node, tree.get_root_index()?);
    assert_eq!(nearest.distance, 1);
    Ok(())
}

// ----------------------------------------------------------------------------
// Attachment

#[test]
fn attach_round_trip_reproduces_sample() -> Result<(), Report> {
    let document = toy_document()?;
    let mut tree = phylogeny::from_auspice(root(&document)?)?;
    let mut states = AncestralStates::accumulate(&tree)?;
    let reference = reference()?;

    let sample = sample("s1", &["A1G", "C2A", "G3T", "T4C"])?;
    let nearest = find_nearest(&tree, &states, &sample)?;
    let parent_state = states.get(nearest.node)?.clone();
    let leaf = attach(&mut tree, &mut states, nearest.node, &sample, &reference)?;

    let mut replayed = parent_state;
    for sub in tree.get_node(leaf)?.substitutions.iter().flatten() {
        state::apply(&mut replayed, sub, "replay")?;
    }
    for sub in &sample.mutations {
        assert_eq!(replayed.get(&sub.coord), Some(&sub.alt));
    }
    assert_eq!(states.get(leaf)?, &replayed);
    Ok(())
}

#[test]
fn attach_appends_last_child_with_divergence() -> Result<(), Report> {
    let document = toy_document()?;
    let mut tree = phylogeny::from_auspice(root(&document)?)?;
    let mut states = AncestralStates::accumulate(&tree)?;

    let parent = tree.get_root_index()?;
    let sample = sample("s1", &["C2A", "G3T"])?;
    let leaf = attach(&mut tree, &mut states, parent, &sample, &reference()?)?;

    assert_eq!(tree.get_children(parent)?.last(), Some(&leaf));
    let node = tree.get_node(leaf)?;
    assert_eq!(node.name, "s1_clades");
    assert_eq!(node.divergence(), 2.0);
    assert_eq!(tree.get_branch(leaf)?, &2);
    assert_eq!(node.node_attrs.qc_status.as_ref().map(|a| &a.value), Some(&json!("good")));
    assert_eq!(node.node_attrs.clade_membership.as_ref().map(|a| &a.value), Some(&json!("20A")));
    Ok(())
}

#[test]
fn attach_collapses_repeated_positions() -> Result<(), Report> {
    let document = toy_document()?;
    let mut tree = phylogeny::from_auspice(root(&document)?)?;
    let mut states = AncestralStates::accumulate(&tree)?;

    let parent = tree.get_root_index()?;
    let sample = sample("s1", &["T4G", "A1C", "A1G", "T4A"])?;
    let leaf = attach(&mut tree, &mut states, parent, &sample, &reference()?)?;

    let node = tree.get_node(leaf)?;
    let tokens: Vec<_> = node.substitutions.iter().flatten().map(|s| s.to_string()).collect();
    assert_eq!(tokens, ["A1G", "T4A"]);
    assert_eq!(node.divergence(), 2.0);
    assert_eq!(states.get(leaf)?, &MutationMap::from([(0, 'G'), (3, 'A')]));
    Ok(())
}

#[test]
fn private_substitutions_keep_reference_case() -> Result<(), Report> {
    let reference: Reference = "acgT".parse()?;
    assert_eq!(reference.sequence, ['a', 'c', 'g', 'T']);

    let sample = sample("s1", &["A1C", "T4G"])?;
    let subs = private_substitutions(&MutationMap::new(), &sample, &reference)?;
    let tokens: Vec<_> = subs.iter().map(|s| s.to_string()).collect();
    assert_eq!(tokens, ["a1C", "T4G"]);
    Ok(())
}

#[test]
fn attach_rejects_position_outside_reference() -> Result<(), Report> {
    let document = toy_document()?;
    let mut tree = phylogeny::from_auspice(root(&document)?)?;
    let mut states = AncestralStates::accumulate(&tree)?;

    let parent = tree.get_root_index()?;
    let sample = sample("s1", &["A10C"])?;
    let error = attach(&mut tree, &mut states, parent, &sample, &reference()?)
        .err()
        .ok_or_else(|| eyre!("expected an error"))?;
    let expected =
        PlacementError::OutsideReference { sample: "s1".to_string(), position: 10, length: 4 };
    assert_eq!(error.downcast_ref::<PlacementError>(), Some(&expected));
    assert_eq!(tree.len(), 4);
    Ok(())
}

// ----------------------------------------------------------------------------
// Orchestrator

#[test]
fn locate_in_tree_acgt_scenario() -> Result<(), Report> {
    let document = document(json!({
        "name": "root",
        "children": [{"name": "child", "branch_attrs": {"mutations": {"nuc": ["A1C"]}}}]
    }))?;
    let samples = [sample("s1", &["A1C", "T4A"])?];

    let tree = phylogeny::from_auspice(root(&document)?)?;
    let states = AncestralStates::accumulate(&tree)?;
    let order = tree.preorder()?;
    let [root_index, child_index] = order[..] else {
        return Err(eyre!("expected two nodes"));
    };
    assert_eq!(distance(states.get(root_index)?, &samples[0].genotype()), 2);
    assert_eq!(distance(states.get(child_index)?, &samples[0].genotype()), 1);

    let placement = locate_in_tree(&samples, &document, &reference()?)?;
    let child = find(root(&placement.tree)?, "child").ok_or_else(|| eyre!("missing child"))?;
    let leaf = &children(child)[0];
    assert_eq!(leaf.name, "s1_clades");
    assert_eq!(leaf.branch_attrs.mutations.nuc, Some(vec!["T4A".to_string()]));
    assert_eq!(leaf.node_attrs.div, Some(1.0));
    Ok(())
}

#[test]
fn locate_in_tree_skips_samples_with_errors() -> Result<(), Report> {
    let document = toy_document()?;
    let mut failed = sample("s2", &["A1C"])?;
    failed.errors.push("alignment failed".to_string());
    let samples = [sample("s1", &["A1C"])?, failed, sample("s3", &["T4A"])?];

    let placement = locate_in_tree(&samples, &document, &reference()?)?;
    assert_eq!(count_nodes(root(&placement.tree)?), 4 + 2);
    assert_eq!(placement.summary.placed(), 2);
    assert_eq!(placement.summary.skipped(), 1);
    assert_eq!(placement.summary.records[1], PlacementRecord::skipped("s2"));
    assert!(find(root(&placement.tree)?, "s2_clades").is_none());
    Ok(())
}

#[test]
fn locate_in_tree_places_onto_earlier_samples() -> Result<(), Report> {
    let document = toy_document()?;
    let samples = [sample("s1", &["T4A", "C2G"])?, sample("s2", &["T4A", "C2G", "G3C"])?];

    let placement = locate_in_tree(&samples, &document, &reference()?)?;
    let records = &placement.summary.records;
    assert_eq!(records[0].attached_to.as_deref(), Some("C"));
    assert_eq!(records[1].attached_to.as_deref(), Some("s1_clades"));
    assert_eq!(records[1].private_substitutions, ["G3C".parse::<Substitution>()?]);

    let s1 = find(root(&placement.tree)?, "s1_clades").ok_or_else(|| eyre!("missing s1"))?;
    assert_eq!(children(s1)[0].name, "s2_clades");
    assert_eq!(children(s1)[0].node_attrs.div, Some(3.0));
    Ok(())
}

#[test]
fn locate_in_tree_output_can_be_placed_onto_again() -> Result<(), Report> {
    let document = document(json!({"name": "root"}))?;
    let placement = locate_in_tree(&[sample("s1", &["A1C", "A1G"])?], &document, &reference()?)?;

    let leaf = find(root(&placement.tree)?, "s1_clades").ok_or_else(|| eyre!("missing s1"))?;
    assert_eq!(leaf.branch_attrs.mutations.nuc, Some(vec!["A1G".to_string()]));
    assert_eq!(placement.summary.records[0].distance, Some(1));

    // the written tree is accepted as input of a second run
    let tree = phylogeny::from_auspice(root(&placement.tree)?)?;
    AncestralStates::accumulate(&tree)?;
    let placement = locate_in_tree(&[sample("s2", &["A1G", "C2T"])?], &placement.tree, &reference()?)?;
    let records = &placement.summary.records;
    assert_eq!(records[0].attached_to.as_deref(), Some("s1_clades"));
    assert_eq!(records[0].private_substitutions, ["C2T".parse::<Substitution>()?]);
    Ok(())
}

#[test]
fn locate_in_tree_places_onto_deep_tree() -> Result<(), Report> {
    // a ladder of 300 nodes, each branch flipping position 1 between C and A
    let depth = 300;
    let mut node = json!({"name": format!("n{}", depth - 1)});
    for i in (0..depth - 1).rev() {
        let child_mutation = if i % 2 == 0 { "A1C" } else { "C1A" };
        node["branch_attrs"] = json!({"mutations": {"nuc": [child_mutation]}});
        node = json!({"name": format!("n{i}"), "children": [node]});
    }
    let text = json!({"version": "v2", "meta": {}, "tree": node}).to_string();
    let document = AuspiceTree::from_json(&text)?;

    let samples = [sample("s1", &["A1C", "G3T"])?];
    let placement = locate_in_tree(&samples, &document, &reference()?)?;
    let record = &placement.summary.records[0];
    assert_eq!(record.attached_to.as_deref(), Some("n1"));
    assert_eq!(record.distance, Some(1));
    assert_eq!(placement.phylogeny.len(), depth + 1);
    Ok(())
}

#[test]
fn locate_in_tree_preserves_document() -> Result<(), Report> {
    let document = toy_document()?;
    let original = document.clone();
    let samples = [sample("s1", &["A1C"])?];
    let samples_original = samples.clone();

    let placement = locate_in_tree(&samples, &document, &reference()?)?;
    assert_eq!(document, original);
    assert_eq!(samples, samples_original);

    // existing nodes keep every attribute, including ones that are not typed
    let observed = serde_json::to_value(&placement.tree)?;
    let expected = serde_json::to_value(&original)?;
    assert_eq!(observed["meta"]["title"], expected["meta"]["title"]);
    assert_eq!(
        observed["tree"]["children"][0]["branch_attrs"],
        expected["tree"]["children"][0]["branch_attrs"]
    );
    assert_eq!(observed["tree"]["children"][1], expected["tree"]["children"][1]);
    Ok(())
}

#[test]
fn locate_in_tree_leaves_no_transient_state() -> Result<(), Report> {
    let document = toy_document()?;
    let samples = [sample("s1", &["A1C", "G3A"])?];
    let placement = locate_in_tree(&samples, &document, &reference()?)?;

    let observed = serde_json::to_value(&placement.tree)?;
    let leaf = &observed["tree"]["children"][0]["children"][1];
    assert_eq!(leaf["name"], "s1_clades");
    let mut keys: Vec<_> = leaf.as_object().into_iter().flat_map(|o| o.keys()).collect();
    keys.sort();
    assert_eq!(keys, ["branch_attrs", "name", "node_attrs"]);

    let mut attrs: Vec<_> = leaf["node_attrs"].as_object().into_iter().flat_map(|o| o.keys()).collect();
    attrs.sort();
    assert_eq!(attrs, ["QCStatus", "clade_membership", "div", "new_node"]);
    Ok(())
}

#[test]
fn locate_in_tree_decorates_meta() -> Result<(), Report> {
    let document = toy_document()?;
    let placement = locate_in_tree(&[], &document, &reference()?)?;

    let keys: Vec<_> = placement.tree.meta.colorings.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, ["region", "QCStatus", "new_node"]);

    let observed = serde_json::to_value(&placement.tree.meta.display_defaults)?;
    let expected = json!({
        "branch_label": "clade",
        "color_by": "new_node",
        "distance_measure": "div",
        "geo_resolution": "country",
        "map_triplicate": true,
        "transmission_lines": false
    });
    assert_eq!(observed, expected);

    // decorating again duplicates the legends
    let placement = locate_in_tree(&[], &placement.tree, &reference()?)?;
    assert_eq!(placement.tree.meta.colorings.len(), 5);
    Ok(())
}

#[test]
fn locate_in_tree_rejects_unknown_format() -> Result<(), Report> {
    let reference = reference()?;

    let mut document = toy_document()?;
    document.version = Some(json!("v1"));
    let error = locate_in_tree(&[], &document, &reference).err().ok_or_else(|| eyre!("expected an error"))?;
    let expected =
        PlacementError::UnknownVersion { expected: "v2".to_string(), found: "v1".to_string() };
    assert_eq!(error.downcast_ref::<PlacementError>(), Some(&expected));

    document.version = None;
    let error = locate_in_tree(&[], &document, &reference).err().ok_or_else(|| eyre!("expected an error"))?;
    assert!(error.to_string().contains("got undefined"));

    document.version = Some(json!(2));
    let error = locate_in_tree(&[], &document, &reference).err().ok_or_else(|| eyre!("expected an error"))?;
    let expected =
        PlacementError::UnknownVersion { expected: "v2".to_string(), found: "2".to_string() };
    assert_eq!(error.downcast_ref::<PlacementError>(), Some(&expected));

    document.version = Some(json!("v2"));
    document.tree = None;
    let error = locate_in_tree(&[], &document, &reference).err().ok_or_else(|| eyre!("expected an error"))?;
    assert_eq!(error.downcast_ref::<PlacementError>(), Some(&PlacementError::MissingRoot));
    Ok(())
}

#[test]
fn locate_in_tree_rejects_invalid_tree_mutation() -> Result<(), Report> {
    let document = document(json!({
        "name": "root",
        "children": [{"name": "A", "branch_attrs": {"mutations": {"nuc": ["A1C", "A?C"]}}}]
    }))?;
    let error = locate_in_tree(&[], &document, &reference()?)
        .err()
        .ok_or_else(|| eyre!("expected an error"))?;
    let expected = PlacementError::InvalidMutation { mutation: "A?C".to_string(), node: "A".to_string() };
    assert_eq!(error.downcast_ref::<PlacementError>(), Some(&expected));
    Ok(())
}
