use super::Tree;
use crate::libs::phylo::error::TreeError;
use crate::libs::phylo::node::NodeId;

/// Tolerance used by [`stats`] for the ultrametric check.
pub const ULTRAMETRIC_EPSILON: f64 = 1e-4;

/// Check if tree is binary (all internal nodes have exactly two children).
pub fn is_binary(tree: &Tree) -> bool {
    tree.nodes()
        .all(|n| n.children.is_empty() || n.children.len() == 2)
}

/// Distance from the root to each tip, in tip order.
pub fn root_to_tip(tree: &Tree) -> Vec<(NodeId, f64)> {
    let root = match tree.get_root() {
        Some(r) => r,
        None => return Vec::new(),
    };

    let mut result = Vec::new();
    let mut stack = vec![(root, 0.0)];
    while let Some((id, dist)) = stack.pop() {
        let node = match tree.get_node(id) {
            Some(n) => n,
            None => continue,
        };
        if node.children.is_empty() {
            result.push((id, dist));
        }
        for &child in node.children.iter().rev() {
            stack.push((child, dist + tree.nodes[child].edge()));
        }
    }
    result
}

/// All tips lie within `epsilon` of the same distance from the root.
pub fn is_ultrametric(tree: &Tree, epsilon: f64) -> bool {
    let dists: Vec<f64> = root_to_tip(tree).into_iter().map(|(_, d)| d).collect();
    if dists.is_empty() {
        return true;
    }
    let max = dists.iter().cloned().fold(f64::MIN, f64::max);
    let min = dists.iter().cloned().fold(f64::MAX, f64::min);
    max - min <= epsilon
}

/// Largest number of edges between the root and a tip.
pub fn max_levels(tree: &Tree) -> usize {
    let root = match tree.get_root() {
        Some(r) => r,
        None => return 0,
    };

    let mut max = 0;
    let mut stack = vec![(root, 0)];
    while let Some((id, depth)) = stack.pop() {
        if let Some(node) = tree.get_node(id) {
            max = max.max(depth);
            for &child in &node.children {
                stack.push((child, depth + 1));
            }
        }
    }
    max
}

/// Sum of all branch lengths below the root.
pub fn total_length(tree: &Tree) -> f64 {
    tree.nodes()
        .filter(|n| Some(n.id) != tree.root)
        .map(|n| n.edge())
        .sum()
}

/// Summary numbers for one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub nodes: usize,
    pub tips: usize,
    pub binary: bool,
    pub ultrametric: bool,
    pub root_height: f64,
    pub max_root_to_tip: f64,
    pub min_root_to_tip: f64,
    pub mean_root_to_tip: f64,
    pub levels: usize,
    pub total_length: f64,
}

impl TreeStats {
    /// Key/value pairs in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("nodes", self.nodes.to_string()),
            ("tips", self.tips.to_string()),
            ("binary", self.binary.to_string()),
            ("ultrametric", self.ultrametric.to_string()),
            ("root height", self.root_height.to_string()),
            ("max root-to-tip", self.max_root_to_tip.to_string()),
            ("min root-to-tip", self.min_root_to_tip.to_string()),
            ("mean root-to-tip", self.mean_root_to_tip.to_string()),
            ("levels", self.levels.to_string()),
            ("total length", self.total_length.to_string()),
        ]
    }

    /// Two-column TSV, one statistic per line.
    pub fn to_tsv(&self) -> String {
        self.rows()
            .into_iter()
            .map(|(k, v)| format!("{}\t{}\n", k, v))
            .collect()
    }
}

pub fn stats(tree: &Tree) -> Result<TreeStats, TreeError> {
    let root = tree.root_id()?;
    let dists: Vec<f64> = root_to_tip(tree).into_iter().map(|(_, d)| d).collect();
    let tips = dists.len();

    let (max, min, mean) = if tips == 0 {
        (0.0, 0.0, 0.0)
    } else {
        (
            dists.iter().cloned().fold(f64::MIN, f64::max),
            dists.iter().cloned().fold(f64::MAX, f64::min),
            dists.iter().sum::<f64>() / tips as f64,
        )
    };

    Ok(TreeStats {
        nodes: tree.preorder(root).len(),
        tips,
        binary: is_binary(tree),
        ultrametric: max - min <= ULTRAMETRIC_EPSILON,
        root_height: tree.height(root),
        max_root_to_tip: max,
        min_root_to_tip: min,
        mean_root_to_tip: mean,
        levels: max_levels(tree),
        total_length: total_length(tree),
    })
}
