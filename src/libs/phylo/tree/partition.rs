use super::{ops, traversal, Tree};
use crate::libs::phylo::error::TreeError;
use crate::libs::phylo::node::{AttrValue, Node, NodeId};
use std::collections::BTreeMap;

/// Whether a tip carrying `tip_value` belongs to the group `value`.
///
/// With `hierarchical`, values are dot-separated lineages and `value` also
/// covers its sublineages: `B.1` covers `B.1.1.7` but not `B.11`.
///
/// ```
/// use clade::libs::phylo::tree::partition::is_compatible;
/// assert!(is_compatible("B.1.1.7", "B.1", true));
/// assert!(!is_compatible("B.11", "B.1", true));
/// assert!(!is_compatible("B.1.1.7", "B.1", false));
/// ```
pub fn is_compatible(tip_value: &str, value: &str, hierarchical: bool) -> bool {
    if tip_value == value {
        return true;
    }
    if !hierarchical {
        return false;
    }

    let mut tip_segments = tip_value.split('.');
    value
        .split('.')
        .all(|segment| tip_segments.next() == Some(segment))
}

/// Values a node holds for `attr`, as strings.
fn node_values(node: &Node, attr: &str) -> Vec<String> {
    match node.get_attribute(attr) {
        Some(AttrValue::Set(set)) => set.iter().cloned().collect(),
        Some(other) => vec![other.to_string()],
        None => Vec::new(),
    }
}

/// Sort lineage labels by length, then lexicographically, dropping repeats.
/// General lineages come before their sublineages.
pub fn sort_lineages<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut values: Vec<String> = values.into_iter().collect();
    values.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    values.dedup();
    values
}

/// Tag every maximal clade whose tips are all compatible with `value`.
///
/// A tip is compatible when its `attr` value is; an internal node is
/// compatible when all of its children are. Each compatible node whose
/// parent is not compatible gets `value` added to the set under `out_attr`.
/// Returns the tagged nodes in preorder.
pub fn annotate_monophyletic(
    tree: &mut Tree,
    attr: &str,
    value: &str,
    hierarchical: bool,
    out_attr: &str,
) -> Result<Vec<NodeId>, TreeError> {
    let root = tree.root_id()?;

    let mut compatible = vec![false; tree.nodes.len()];
    for id in traversal::postorder(tree, root) {
        let node = &tree.nodes[id];
        compatible[id] = if node.children.is_empty() {
            node_values(node, attr)
                .iter()
                .any(|v| is_compatible(v, value, hierarchical))
        } else {
            node.children.iter().all(|&c| compatible[c])
        };
    }

    let maximal: Vec<NodeId> = traversal::preorder(tree, root)
        .into_iter()
        .filter(|&id| {
            compatible[id]
                && match tree.nodes[id].parent {
                    Some(p) => !compatible[p],
                    None => true,
                }
        })
        .collect();

    for &id in &maximal {
        tree.nodes[id].add_tag(out_attr, value);
    }

    Ok(maximal)
}

/// Tips grouped by their value of `attr`.
pub fn collect_tip_values(tree: &Tree, attr: &str) -> BTreeMap<String, Vec<NodeId>> {
    let mut groups: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
    for id in tree.get_leaves() {
        for value in node_values(&tree.nodes[id], attr) {
            groups.entry(value).or_default().push(id);
        }
    }
    groups
}

/// Tag the maximal monophyletic clades of every value found on the tips.
///
/// Any previous `out_attr` annotations are cleared first. Values are
/// processed in lineage order; the processed values are returned.
pub fn annotate_all(
    tree: &mut Tree,
    attr: &str,
    hierarchical: bool,
    out_attr: &str,
) -> Result<Vec<String>, TreeError> {
    tree.root_id()?;
    for node in tree.nodes.iter_mut() {
        node.attributes.remove(out_attr);
    }

    let values = sort_lineages(collect_tip_values(tree, attr).into_keys());
    for value in &values {
        annotate_monophyletic(tree, attr, value, hierarchical, out_attr)?;
    }

    Ok(values)
}

/// One tree per clade tagged `value` under `out_attr`, in preorder.
///
/// A clade with a single tip yields a single-node tree.
pub fn split_by_value(tree: &Tree, out_attr: &str, value: &str) -> Result<Vec<Tree>, TreeError> {
    let root = tree.root_id()?;

    let mut result = Vec::new();
    for id in traversal::preorder(tree, root) {
        let tagged = tree.nodes[id]
            .get_attribute(out_attr)
            .is_some_and(|v| v.has(value));
        if !tagged {
            continue;
        }

        let tips: Vec<NodeId> = tree.tips(id).collect();
        let mut part = if tips.len() == 1 {
            traversal::extract_subtree(tree, tips[0])?
        } else {
            ops::induce_subtree_ids(tree, &tips)?
        };
        if let Some(r) = part.get_root() {
            if let Some(node) = part.get_node_mut(r) {
                node.length = None;
            }
        }
        result.push(part);
    }

    Ok(result)
}
