use super::query;
use super::Tree;
use crate::libs::phylo::error::{MissingPolicy, TreeError};
use crate::libs::phylo::node::NodeId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Link without validation. Callers guarantee `id` is parentless and that no
/// cycle can form, e.g. when copying nodes into a fresh tree top-down.
pub(crate) fn link(tree: &mut Tree, id: NodeId, parent_id: NodeId) {
    tree.nodes[id].parent = Some(parent_id);
    tree.nodes[parent_id].children.push(id);
}

fn sum_lengths(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(p), Some(c)) => Some(p + c),
        (Some(p), None) => Some(p),
        (None, Some(c)) => Some(c),
        (None, None) => None,
    }
}

/// Append `id` to the children of `parent_id`.
///
/// # Errors
/// * `Cycle` if `parent_id` is `id` or one of its descendants
/// * `AlreadyAttached` if `id` still hangs under another node
pub fn attach(tree: &mut Tree, id: NodeId, parent_id: NodeId) -> Result<(), TreeError> {
    tree.node(id)?;
    tree.node(parent_id)?;

    if query::is_descendant(tree, parent_id, id) {
        return Err(TreeError::Cycle {
            node: id,
            parent: parent_id,
        });
    }
    if let Some(old_parent) = tree.nodes[id].parent {
        return Err(TreeError::AlreadyAttached {
            node: id,
            parent: old_parent,
        });
    }
    if tree.root == Some(id) {
        return Err(TreeError::LogicError(format!(
            "Cannot attach root node {}",
            id
        )));
    }

    link(tree, id, parent_id);
    Ok(())
}

/// Remove `id` from its parent's children. The node keeps its own subtree.
pub fn detach(tree: &mut Tree, id: NodeId) -> Result<(), TreeError> {
    tree.node(id)?;
    if tree.root == Some(id) {
        return Err(TreeError::RootDetach(id));
    }

    if let Some(parent_id) = tree.nodes[id].parent.take() {
        tree.nodes[parent_id].children.retain(|&c| c != id);
    }
    Ok(())
}

/// New parentless internal node over the given parentless nodes.
pub fn create_internal(tree: &mut Tree, children: &[NodeId]) -> Result<NodeId, TreeError> {
    let mut seen = HashSet::new();
    for &child in children {
        let node = tree.node(child)?;
        if let Some(parent) = node.parent {
            return Err(TreeError::AlreadyAttached {
                node: child,
                parent,
            });
        }
        if tree.root == Some(child) {
            return Err(TreeError::LogicError(format!(
                "Cannot attach root node {}",
                child
            )));
        }
        if !seen.insert(child) {
            return Err(TreeError::LogicError(format!(
                "Node {} listed twice",
                child
            )));
        }
    }

    let id = tree.add_node();
    for &child in children {
        link(tree, child, id);
    }
    Ok(id)
}

/// New parentless tip.
pub fn create_external(tree: &mut Tree, taxon: &str) -> NodeId {
    let id = tree.add_node();
    tree.nodes[id].set_name(taxon);
    id
}

/// Soft remove a node and its descendants (optional recursive).
/// If recursive is false, children are orphaned (parent set to None).
pub fn remove_node(tree: &mut Tree, id: NodeId, recursive: bool) {
    if tree.get_node(id).is_none() {
        return;
    }

    if let Some(parent_id) = tree.nodes[id].parent {
        tree.nodes[parent_id].children.retain(|&child| child != id);
    }

    let doomed = if recursive {
        super::traversal::preorder(tree, id)
    } else {
        for child in tree.nodes[id].children.clone() {
            tree.nodes[child].parent = None;
        }
        vec![id]
    };

    for d in doomed {
        let node = &mut tree.nodes[d];
        node.deleted = true;
        node.children.clear();
        node.parent = None;
        if tree.root == Some(d) {
            tree.root = None;
        }
    }
}

/// Replace a non-root internal node by its children, at its position in the
/// parent's child list. With `keep_length`, the node's branch length is added
/// to each child.
fn lift_children(tree: &mut Tree, id: NodeId, keep_length: bool) -> Result<(), TreeError> {
    let node = tree.node(id)?;
    if tree.root == Some(id) {
        return Err(TreeError::LogicError(format!(
            "Cannot remove root node {}",
            id
        )));
    }
    if node.children.is_empty() {
        return Err(TreeError::LogicError(format!("Node {} is a tip", id)));
    }
    let parent_id = node.parent.ok_or_else(|| {
        TreeError::LogicError(format!("Node {} is detached from the tree", id))
    })?;
    let length = node.length;
    let children = node.children.clone();

    for &child in &children {
        let child_node = &mut tree.nodes[child];
        child_node.parent = Some(parent_id);
        if keep_length {
            child_node.length = sum_lengths(length, child_node.length);
        }
    }

    let siblings = &mut tree.nodes[parent_id].children;
    if let Some(pos) = siblings.iter().position(|&x| x == id) {
        siblings.splice(pos..pos + 1, children);
    }

    let node = &mut tree.nodes[id];
    node.deleted = true;
    node.children.clear();
    node.parent = None;

    Ok(())
}

/// Contract the edge above a non-root internal node.
///
/// The node's children move up to its parent and the node's own branch is
/// dropped, forming (or enlarging) a polytomy.
pub fn contract_edge(tree: &mut Tree, id: NodeId) -> Result<(), TreeError> {
    lift_children(tree, id, false)
}

/// Remove a non-root internal node, adding its branch length to each child,
/// so that all tip-to-tip distances are unchanged.
pub fn splice_node(tree: &mut Tree, id: NodeId) -> Result<(), TreeError> {
    lift_children(tree, id, true)
}

/// Contract every non-root internal branch strictly shorter than `threshold`.
/// Returns the number of contracted branches.
///
/// A threshold that is not positive is `InvalidFactor` and leaves the tree
/// untouched, zero-length branches included.
pub fn collapse_below(tree: &mut Tree, threshold: f64) -> Result<usize, TreeError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(TreeError::InvalidFactor {
            what: "branch length threshold",
            value: threshold,
        });
    }

    // Decided up front, so one contraction can't change another's outcome
    let candidates: Vec<NodeId> = tree
        .nodes()
        .filter(|n| Some(n.id) != tree.root && n.parent.is_some() && !n.children.is_empty())
        .filter(|n| n.edge() < threshold)
        .map(|n| n.id)
        .collect();

    for &id in &candidates {
        contract_edge(tree, id)?;
    }

    Ok(candidates.len())
}

/// Multiply every branch length by `factor`.
pub fn scale(tree: &mut Tree, factor: f64) -> Result<(), TreeError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(TreeError::InvalidFactor {
            what: "scale factor",
            value: factor,
        });
    }

    for node in tree.nodes.iter_mut().filter(|n| !n.deleted) {
        if let Some(length) = node.length.as_mut() {
            *length *= factor;
        }
    }
    Ok(())
}

/// Scale so the mean root-to-tip distance becomes `height`.
/// Returns the factor applied.
pub fn scale_to_height(tree: &mut Tree, height: f64) -> Result<f64, TreeError> {
    if !height.is_finite() || height <= 0.0 {
        return Err(TreeError::InvalidFactor {
            what: "root height",
            value: height,
        });
    }
    let root = tree.root_id()?;
    let current = query::average_tip_distance(tree, root);
    if current <= 0.0 {
        return Err(TreeError::InvalidFactor {
            what: "mean root-to-tip distance",
            value: current,
        });
    }

    let factor = height / current;
    scale(tree, factor)?;
    Ok(factor)
}

/// Compact the tree by removing soft-deleted nodes and remapping IDs.
/// This invalidates all existing NodeIds held outside!
pub fn compact(tree: &mut Tree) {
    let mut old_to_new = HashMap::new();
    let mut new_nodes = Vec::with_capacity(tree.nodes.len());

    // 1. Build mapping and new node list (without edges first)
    for old_node in tree.nodes.iter().filter(|n| !n.deleted) {
        let new_idx = new_nodes.len();
        old_to_new.insert(old_node.id, new_idx);
        let mut new_node = old_node.clone();
        new_node.id = new_idx;
        new_node.parent = None;
        new_node.children.clear();
        new_nodes.push(new_node);
    }

    // 2. Reconstruct edges using the mapping
    for node in tree.nodes.iter().filter(|n| !n.deleted) {
        let new_self_idx = old_to_new[&node.id];

        if let Some(old_parent) = node.parent {
            if let Some(&new_parent) = old_to_new.get(&old_parent) {
                new_nodes[new_self_idx].parent = Some(new_parent);
            }
        }

        for &old_child in &node.children {
            if let Some(&new_child) = old_to_new.get(&old_child) {
                new_nodes[new_self_idx].children.push(new_child);
            }
        }
    }

    // 3. Update root
    if let Some(old_root) = tree.root {
        tree.root = old_to_new.get(&old_root).copied();
    }

    tree.nodes = new_nodes;
}

/// Insert a node on the edge above `id`, `offset` away from the parent.
/// The new node takes `id`'s place in the parent's child list.
/// Returns the new node's ID.
pub fn insert_parent(tree: &mut Tree, id: NodeId, offset: f64) -> Result<NodeId, TreeError> {
    let node = tree.node(id)?;
    let parent = node.parent.ok_or_else(|| {
        TreeError::LogicError(format!("Node {} has no parent edge to split", id))
    })?;
    let length = node.edge();
    if !offset.is_finite() || offset < 0.0 || offset > length {
        return Err(TreeError::InvalidFactor {
            what: "edge offset",
            value: offset,
        });
    }
    let has_length = node.length.is_some();

    let new_node = tree.add_node();

    let siblings = &mut tree.nodes[parent].children;
    if let Some(pos) = siblings.iter().position(|&c| c == id) {
        siblings[pos] = new_node;
    }
    tree.nodes[new_node].parent = Some(parent);
    tree.nodes[new_node].children.push(id);
    tree.nodes[id].parent = Some(new_node);

    if has_length || offset > 0.0 {
        tree.nodes[new_node].length = Some(offset);
        tree.nodes[id].length = Some((length - offset).max(0.0));
    }

    Ok(new_node)
}

/// Checks shared by single and batch insertion.
fn check_insertion(
    tree: &Tree,
    tip: NodeId,
    new_taxa: &[String],
    taken: &mut HashSet<String>,
) -> Result<(), TreeError> {
    let node = tree.node(tip)?;
    if !node.children.is_empty() {
        return Err(TreeError::LogicError(format!(
            "Node {} is not a tip",
            tip
        )));
    }
    if node.parent.is_none() {
        return Err(TreeError::LogicError(format!(
            "Tip {} has no parent to insert under",
            tip
        )));
    }
    for taxon in new_taxa {
        if !taken.insert(taxon.clone()) {
            return Err(TreeError::DuplicateTaxon(taxon.clone()));
        }
    }
    Ok(())
}

fn split_edge_unchecked(tree: &mut Tree, tip: NodeId, new_taxa: &[String]) -> NodeId {
    let length = tree.nodes[tip].edge();
    let target = if length > 0.0 {
        // Checked in check_insertion: the tip has a parent and offset == length is in range
        insert_parent(tree, tip, length).unwrap_or(tip)
    } else {
        tree.nodes[tip].parent.unwrap_or(tip)
    };

    for taxon in new_taxa {
        let child = create_external(tree, taxon);
        tree.nodes[child].length = Some(0.0);
        link(tree, child, target);
    }
    target
}

/// Turn a tip into a polytomy of itself plus `new_taxa`.
///
/// When the tip's branch is longer than zero, a new internal node takes over
/// that branch and the tip hangs below it at length 0. Each new taxon is a
/// zero-length tip under the polytomy node, whose ID is returned.
pub fn split_edge_and_insert(
    tree: &mut Tree,
    tip: NodeId,
    new_taxa: &[String],
) -> Result<NodeId, TreeError> {
    let mut taken: HashSet<String> = query::tip_map(tree).into_keys().collect();
    check_insertion(tree, tip, new_taxa, &mut taken)?;

    if new_taxa.is_empty() {
        return tree.node(tip)?.parent.ok_or(TreeError::NodeNotFound(tip));
    }
    Ok(split_edge_unchecked(tree, tip, new_taxa))
}

/// Counts from a batch insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// New tips added
    pub inserted: usize,
    /// Destination tips that received insertions
    pub destinations: usize,
    /// Taxa left out because their destination was missing
    pub skipped: usize,
}

/// Insert tips next to existing tips, keyed by destination taxon name.
///
/// Everything is validated before the first insertion.
pub fn insert_tips(
    tree: &mut Tree,
    insertions: &BTreeMap<String, Vec<String>>,
    policy: MissingPolicy,
) -> Result<InsertReport, TreeError> {
    let id_of = query::tip_map(tree);
    let mut taken: HashSet<String> = id_of.keys().cloned().collect();
    let mut report = InsertReport::default();

    let mut resolved = Vec::new();
    for (destination, taxa) in insertions {
        if taxa.is_empty() {
            continue;
        }
        match id_of.get(destination) {
            Some(&tip) => {
                check_insertion(tree, tip, taxa, &mut taken)?;
                resolved.push((tip, taxa));
            }
            None => match policy {
                MissingPolicy::Fail => return Err(TreeError::MissingTaxon(destination.clone())),
                MissingPolicy::Skip => report.skipped += taxa.len(),
            },
        }
    }

    for (tip, taxa) in resolved {
        split_edge_unchecked(tree, tip, taxa);
        report.inserted += taxa.len();
        report.destinations += 1;
    }

    Ok(report)
}

/// New tree holding exactly the named tips and the topology connecting them.
///
/// Returns the tree and the number of names skipped under
/// `MissingPolicy::Skip`.
pub fn induce_subtree<S: AsRef<str>>(
    tree: &Tree,
    keep_taxa: &[S],
    policy: MissingPolicy,
) -> Result<(Tree, usize), TreeError> {
    let (ids, missing) = query::resolve_taxa(tree, keep_taxa, policy)?;
    let induced = induce_subtree_ids(tree, &ids)?;
    Ok((induced, missing.len()))
}

/// Induced subtree over tip IDs.
///
/// Ancestors of the kept tips are retained; a retained node left with one
/// retained child is spliced out and its branch length carried down, so
/// every path between kept tips keeps its length. The MRCA of the kept tips
/// becomes the new root.
pub fn induce_subtree_ids(tree: &Tree, tips: &[NodeId]) -> Result<Tree, TreeError> {
    for &id in tips {
        if !tree.node(id)?.children.is_empty() {
            return Err(TreeError::LogicError(format!("Node {} is not a tip", id)));
        }
    }
    let keep: HashSet<NodeId> = tips.iter().copied().collect();
    if keep.len() < 2 {
        return Err(TreeError::InsufficientTaxa(keep.len()));
    }

    let mut retained = vec![false; tree.nodes.len()];
    for &id in &keep {
        let mut current = Some(id);
        while let Some(c) = current {
            if retained[c] {
                break;
            }
            retained[c] = true;
            current = tree.nodes[c].parent;
        }
    }

    let start = query::mrca(tree, tips)?;
    let retained_children = |id: NodeId| -> Vec<NodeId> {
        tree.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|&c| retained[c])
            .collect()
    };

    let mut new_tree = Tree::new();
    let copy = |new_tree: &mut Tree, old: NodeId| -> NodeId {
        let new_id = new_tree.add_node();
        let src = &tree.nodes[old];
        let dst = &mut new_tree.nodes[new_id];
        dst.name = src.name.clone();
        dst.attributes = src.attributes.clone();
        new_id
    };

    let new_root = copy(&mut new_tree, start);
    new_tree.set_root(new_root);

    let mut stack = vec![(start, new_root)];
    while let Some((old, new)) = stack.pop() {
        for child in retained_children(old) {
            let mut bottom = child;
            let mut length = tree.nodes[child].length;
            loop {
                let below = retained_children(bottom);
                if below.len() != 1 {
                    break;
                }
                bottom = below[0];
                length = sum_lengths(length, tree.nodes[bottom].length);
            }

            let new_id = copy(&mut new_tree, bottom);
            new_tree.nodes[new_id].length = length;
            link(&mut new_tree, new_id, new);
            stack.push((bottom, new_id));
        }
    }

    Ok(new_tree)
}

/// Reroot the tree at the specified node.
/// This reverses the direction of edges along the path from the old root to
/// the new root; each edge keeps its length.
pub fn reroot_at(tree: &mut Tree, new_root_id: NodeId) -> Result<(), TreeError> {
    tree.node(new_root_id)?;

    let old_root_id = tree.root_id()?;
    if old_root_id == new_root_id {
        return Ok(());
    }

    // 1. Get path from old root to new root
    let path = query::get_path_from_root(tree, new_root_id)?;

    // 2. Collect edge lengths along the path
    // path[i]'s length represents edge (path[i-1] -> path[i])
    let lengths: Vec<Option<f64>> = path.iter().map(|&id| tree.nodes[id].length).collect();

    // 3. Reverse edges
    for i in (1..path.len()).rev() {
        let child_id = path[i];
        let parent_id = path[i - 1];

        tree.nodes[parent_id].children.retain(|&x| x != child_id);
        tree.nodes[child_id].children.push(parent_id);

        let parent = &mut tree.nodes[parent_id];
        parent.parent = Some(child_id);
        parent.length = lengths[i];
    }

    // 4. Finalize new root
    let new_root = &mut tree.nodes[new_root_id];
    new_root.parent = None;
    new_root.length = None;

    tree.root = Some(new_root_id);

    Ok(())
}

/// Splice out every non-root node with exactly one child.
pub fn remove_degree_two_nodes(tree: &mut Tree) {
    let root = match tree.root {
        Some(r) => r,
        None => return,
    };

    // Splicing a node never changes another node's child count
    let unary: Vec<NodeId> = super::traversal::postorder(tree, root)
        .into_iter()
        .filter(|&id| id != root && tree.nodes[id].children.len() == 1)
        .collect();

    for id in unary {
        // Non-root internal nodes reached from the root always splice cleanly
        let _ = splice_node(tree, id);
    }
}

/// Direction for [`reorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Smaller clades first
    Increasing,
    /// Larger clades first
    Decreasing,
}

/// Sort the children of every node by their number of tips.
/// Ties keep their current order.
pub fn reorder(tree: &mut Tree, order: Order) {
    let root = match tree.root {
        Some(r) => r,
        None => return,
    };

    let post = super::traversal::postorder(tree, root);
    let mut tip_count: HashMap<NodeId, usize> = HashMap::with_capacity(post.len());
    for &id in &post {
        let node = &tree.nodes[id];
        let count = if node.children.is_empty() {
            1
        } else {
            node.children.iter().map(|c| tip_count[c]).sum()
        };
        tip_count.insert(id, count);
    }

    for id in post {
        let children = &mut tree.nodes[id].children;
        match order {
            Order::Increasing => children.sort_by_key(|c| tip_count[c]),
            Order::Decreasing => children.sort_by_key(|c| std::cmp::Reverse(tip_count[c])),
        }
    }
}
