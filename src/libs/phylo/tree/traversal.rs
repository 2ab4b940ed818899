use super::Tree;
use crate::libs::phylo::error::TreeError;
use crate::libs::phylo::node::NodeId;
use std::collections::VecDeque;

/// Get node IDs in preorder traversal (Root -> Children)
pub fn preorder(tree: &Tree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut stack = vec![start_node];

    while let Some(id) = stack.pop() {
        if let Some(node) = tree.get_node(id) {
            result.push(id);
            // Push children in reverse order so they are processed in order
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
    }

    result
}

/// Get node IDs in postorder traversal (Children -> Root)
///
/// Visits root, then children right to left, and reverses the result.
/// No recursion, so deep caterpillar trees are fine.
pub fn postorder(tree: &Tree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut stack = vec![start_node];

    while let Some(id) = stack.pop() {
        if let Some(node) = tree.get_node(id) {
            result.push(id);
            for &child in &node.children {
                stack.push(child);
            }
        }
    }

    result.reverse();
    result
}

/// Get node IDs in levelorder traversal (BFS)
pub fn levelorder(tree: &Tree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(start_node);

    while let Some(id) = queue.pop_front() {
        if let Some(node) = tree.get_node(id) {
            result.push(id);
            for &child in &node.children {
                queue.push_back(child);
            }
        }
    }

    result
}

/// Lazy iterator over the tips below a node, left to right.
///
/// Call [`Tree::tips`] again to restart.
pub struct Tips<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Tips<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            let node = match self.tree.get_node(id) {
                Some(n) => n,
                None => continue,
            };
            if node.children.is_empty() {
                return Some(id);
            }
            self.stack.extend(node.children.iter().rev());
        }
        None
    }
}

pub fn tips(tree: &Tree, start_node: NodeId) -> Tips<'_> {
    Tips {
        tree,
        stack: vec![start_node],
    }
}

/// Extract a subtree rooted at `node_id`.
/// Returns a new Tree. The new root keeps its original branch length.
pub fn extract_subtree(tree: &Tree, node_id: NodeId) -> Result<Tree, TreeError> {
    tree.node(node_id)?;

    let mut new_tree = Tree::new();

    let mut stack = vec![(node_id, None::<NodeId>)]; // (old_id, new_parent_id)

    while let Some((old_id, new_parent_opt)) = stack.pop() {
        let old_node = tree.node(old_id)?;

        let new_id = new_tree.add_node();

        if let Some(new_node) = new_tree.get_node_mut(new_id) {
            new_node.name = old_node.name.clone();
            new_node.length = old_node.length;
            new_node.attributes = old_node.attributes.clone();
        }

        match new_parent_opt {
            Some(new_parent) => super::ops::link(&mut new_tree, new_id, new_parent),
            None => new_tree.set_root(new_id),
        }

        for &child in old_node.children.iter().rev() {
            stack.push((child, Some(new_id)));
        }
    }

    Ok(new_tree)
}
