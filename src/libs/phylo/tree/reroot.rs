use super::{ops, query, Tree};
use crate::libs::phylo::error::{MissingPolicy, TreeError};
use crate::libs::phylo::node::NodeId;
use std::collections::HashMap;

/// Put the root on the edge above `id`, `offset` away from its parent.
///
/// The old root is spliced out when it is left with one child and removed
/// when left with none. Any other node left with a single child is spliced
/// too, keeping path lengths. Returns the new root.
fn root_on_edge(tree: &mut Tree, id: NodeId, offset: f64) -> Result<NodeId, TreeError> {
    let old_root = tree.root_id()?;

    let new_root = ops::insert_parent(tree, id, offset)?;
    ops::reroot_at(tree, new_root)?;

    match tree.nodes[old_root].children.len() {
        0 => ops::remove_node(tree, old_root, false),
        1 => ops::splice_node(tree, old_root)?,
        _ => {}
    }
    // A unary input root leaves its old child unary
    ops::remove_degree_two_nodes(tree);

    Ok(new_root)
}

/// Root the tree on the edge above the MRCA of the outgroup taxa.
///
/// `fraction` places the root along that edge, measured from the ingroup
/// side: 0 is the parent end, 1 the outgroup end.
pub fn reroot_outgroup<S: AsRef<str>>(
    tree: &mut Tree,
    outgroup: &[S],
    fraction: f64,
) -> Result<NodeId, TreeError> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(TreeError::InvalidFactor {
            what: "root location",
            value: fraction,
        });
    }

    let (ids, _) = query::resolve_taxa(tree, outgroup, MissingPolicy::Fail).map_err(|e| match e {
        TreeError::MissingTaxon(name) => TreeError::UnknownOutgroup(name),
        other => other,
    })?;
    if ids.is_empty() {
        return Err(TreeError::LogicError("Empty outgroup".to_string()));
    }

    let root = tree.root_id()?;
    let anchor = query::mrca(tree, &ids)?;
    if anchor == root {
        return Err(TreeError::LogicError(
            "The outgroup spans the root; it must be a clade of the ingroup".to_string(),
        ));
    }

    let offset = fraction * tree.nodes[anchor].edge();
    root_on_edge(tree, anchor, offset)
}

/// Adjacent nodes in the undirected tree, with the length of the joining edge.
fn neighbors(tree: &Tree, id: NodeId) -> Vec<(NodeId, f64)> {
    let node = &tree.nodes[id];
    let mut result: Vec<(NodeId, f64)> = node
        .children
        .iter()
        .map(|&c| (c, tree.nodes[c].edge()))
        .collect();
    if let Some(p) = node.parent {
        result.push((p, node.edge()));
    }
    result
}

/// Tip farthest from `start` over undirected edges, its distance, and the
/// predecessor of each visited node.
///
/// `start` itself only counts when it is the sole tip, so a tree of
/// zero-length branches still yields two distinct ends.
fn farthest_tip(tree: &Tree, start: NodeId) -> (NodeId, f64, HashMap<NodeId, NodeId>) {
    let mut best: Option<(NodeId, f64)> = None;
    let mut pred = HashMap::new();
    let mut stack = vec![(start, None::<NodeId>, 0.0)];

    while let Some((id, from, dist)) = stack.pop() {
        if let Some(f) = from {
            pred.insert(id, f);
        }
        let is_candidate = id != start && tree.nodes[id].children.is_empty();
        if is_candidate && best.map_or(true, |(_, d)| dist > d) {
            best = Some((id, dist));
        }
        for (next, length) in neighbors(tree, id) {
            if Some(next) != from {
                stack.push((next, Some(id), dist + length));
            }
        }
    }

    let (tip, dist) = best.unwrap_or((start, 0.0));
    (tip, dist, pred)
}

/// The two tips realizing the longest tip-to-tip path, and its length.
pub fn diameter(tree: &Tree) -> Result<(NodeId, NodeId, f64), TreeError> {
    let (a, b, d, _) = diameter_path(tree)?;
    Ok((a, b, d))
}

fn diameter_path(tree: &Tree) -> Result<(NodeId, NodeId, f64, Vec<NodeId>), TreeError> {
    let root = tree.root_id()?;
    let tips: Vec<NodeId> = tree.tips(root).take(2).collect();
    if tips.len() < 2 {
        return Err(TreeError::InsufficientTaxa(tips.len()));
    }

    let (a, _, _) = farthest_tip(tree, tips[0]);
    let (b, d, pred) = farthest_tip(tree, a);

    // b back to a, then flipped
    let mut path = vec![b];
    let mut current = b;
    while current != a {
        current = pred[&current];
        path.push(current);
    }
    path.reverse();

    Ok((a, b, d, path))
}

/// Root the tree halfway along its longest tip-to-tip path.
pub fn reroot_midpoint(tree: &mut Tree) -> Result<NodeId, TreeError> {
    let (_, _, d, path) = diameter_path(tree)?;
    let half = d / 2.0;

    let mut walked = 0.0;
    for pair in path.windows(2) {
        let (u, v) = (pair[0], pair[1]);
        // The edge belongs to whichever end is the child
        let (child, child_is_v) = if tree.nodes[v].parent == Some(u) {
            (v, true)
        } else {
            (u, false)
        };
        let length = tree.nodes[child].edge();

        if walked + length >= half {
            let from_u = (half - walked).clamp(0.0, length);
            let offset = if child_is_v { from_u } else { length - from_u };
            return root_on_edge(tree, child, offset);
        }
        walked += length;
    }

    Err(TreeError::LogicError(
        "Midpoint not found on the longest path".to_string(),
    ))
}
