use std::collections::{BTreeMap, HashMap, HashSet};

use super::Tree;
use crate::libs::phylo::error::{MissingPolicy, TreeError};
use crate::libs::phylo::node::NodeId;

pub fn get_path_from_root(tree: &Tree, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
    let mut path = Vec::new();
    let mut current = id;

    tree.node(current)?;

    loop {
        path.push(current);
        match tree.nodes[current].parent {
            Some(p) => current = p,
            None => break,
        }
    }

    path.reverse();
    if let Some(root) = tree.root {
        if path[0] != root {
            return Err(TreeError::LogicError(format!(
                "Node {} is detached from root",
                id
            )));
        }
    }

    Ok(path)
}

/// Find Lowest Common Ancestor (LCA) of two nodes.
pub fn get_common_ancestor(tree: &Tree, a: NodeId, b: NodeId) -> Result<NodeId, TreeError> {
    mrca(tree, &[a, b])
}

/// Calculate distance between two nodes.
/// Returns (weighted_distance, topological_distance).
pub fn get_distance(tree: &Tree, a: NodeId, b: NodeId) -> Result<(f64, usize), TreeError> {
    let lca = get_common_ancestor(tree, a, b)?;

    let dist_to_lca = |start: NodeId| -> (f64, usize) {
        let mut weighted = 0.0;
        let mut topo = 0;
        let mut curr = start;

        while curr != lca {
            let node = &tree.nodes[curr];
            weighted += node.edge();
            topo += 1;
            match node.parent {
                Some(p) => curr = p,
                None => break,
            }
        }
        (weighted, topo)
    };

    let (w1, t1) = dist_to_lca(a);
    let (w2, t2) = dist_to_lca(b);

    Ok((w1 + w2, t1 + t2))
}

/// True if `ancestor` lies on the path from `id` up to the root, `id` itself included.
pub fn is_descendant(tree: &Tree, id: NodeId, ancestor: NodeId) -> bool {
    let mut current = Some(id);
    while let Some(c) = current {
        if c == ancestor {
            return true;
        }
        current = tree.get_node(c).and_then(|n| n.parent);
    }
    false
}

/// Most recent common ancestor of a set of nodes.
///
/// The root path of the first node is cut back to the deepest node that is
/// also an ancestor of every other node.
pub fn mrca(tree: &Tree, nodes: &[NodeId]) -> Result<NodeId, TreeError> {
    let (&first, rest) = nodes
        .split_first()
        .ok_or_else(|| TreeError::LogicError("MRCA of an empty node set".to_string()))?;

    let mut path = get_path_from_root(tree, first)?;
    let mut depth_of: HashMap<NodeId, usize> =
        path.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    for &id in rest {
        tree.node(id)?;
        let mut current = Some(id);
        let mut hit = None;
        while let Some(c) = current {
            if let Some(&depth) = depth_of.get(&c) {
                hit = Some(depth);
                break;
            }
            current = tree.nodes[c].parent;
        }
        let depth = hit.ok_or_else(|| {
            TreeError::LogicError("Nodes are not in the same tree (no common ancestor)".to_string())
        })?;
        for dropped in path.drain(depth + 1..) {
            depth_of.remove(&dropped);
        }
    }

    path.last().copied().ok_or(TreeError::NodeNotFound(first))
}

/// Number of tips below (or at) a node.
pub fn tip_count(tree: &Tree, id: NodeId) -> usize {
    tree.tips(id).count()
}

/// Height of a node: the longest path from the node down to any of its tips.
pub fn height(tree: &Tree, id: NodeId) -> f64 {
    let mut max = 0.0f64;
    let mut stack = vec![(id, 0.0)];

    while let Some((curr, dist)) = stack.pop() {
        let node = match tree.get_node(curr) {
            Some(n) => n,
            None => continue,
        };
        if node.children.is_empty() {
            max = max.max(dist);
        }
        for &child in &node.children {
            stack.push((child, dist + tree.nodes[child].edge()));
        }
    }
    max
}

/// Mean path length from a node to each of its tips.
pub fn average_tip_distance(tree: &Tree, id: NodeId) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut stack = vec![(id, 0.0)];

    while let Some((curr, dist)) = stack.pop() {
        let node = match tree.get_node(curr) {
            Some(n) => n,
            None => continue,
        };
        if node.children.is_empty() {
            sum += dist;
            count += 1;
        }
        for &child in &node.children {
            stack.push((child, dist + tree.nodes[child].edge()));
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Time of the most recent common ancestor, measured as node height.
///
/// With `stem`, the height of the MRCA's parent is used instead, unless the
/// MRCA is the root.
pub fn tmrca(tree: &Tree, nodes: &[NodeId], stem: bool) -> Result<f64, TreeError> {
    let m = mrca(tree, nodes)?;
    match tree.nodes[m].parent {
        Some(parent) if stem => Ok(height(tree, parent)),
        _ => Ok(height(tree, m)),
    }
}

/// Get node ID by name. Returns first match.
pub fn get_node_by_name(tree: &Tree, name: &str) -> Option<NodeId> {
    tree.nodes()
        .find(|n| n.name.as_deref() == Some(name))
        .map(|n| n.id)
}

/// Map of taxon name to tip ID.
pub fn tip_map(tree: &Tree) -> BTreeMap<String, NodeId> {
    tree.nodes()
        .filter(|n| n.children.is_empty())
        .filter_map(|n| n.name.clone().map(|name| (name, n.id)))
        .collect()
}

/// Look up tips by taxon name.
///
/// Returns the found tip IDs (in input order, duplicates removed) and the
/// names that were skipped under `MissingPolicy::Skip`.
pub fn resolve_taxa<S: AsRef<str>>(
    tree: &Tree,
    names: &[S],
    policy: MissingPolicy,
) -> Result<(Vec<NodeId>, Vec<String>), TreeError> {
    let id_of = tip_map(tree);

    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    let mut missing = Vec::new();
    for name in names {
        let name = name.as_ref();
        match id_of.get(name) {
            Some(&id) => {
                if seen.insert(id) {
                    ids.push(id);
                }
            }
            None => match policy {
                MissingPolicy::Fail => return Err(TreeError::MissingTaxon(name.to_string())),
                MissingPolicy::Skip => missing.push(name.to_string()),
            },
        }
    }

    Ok((ids, missing))
}
