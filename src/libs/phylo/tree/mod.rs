pub mod io;
pub mod ops;
pub mod partition;
pub mod query;
pub mod reroot;
pub mod stat;
#[cfg(test)]
pub mod tests;
pub mod traversal;

use super::error::{MissingPolicy, TreeError};
use super::node::{Node, NodeId};
use std::collections::{BTreeMap, BTreeSet};

pub use ops::{InsertReport, Order};
pub use stat::TreeStats;
pub use traversal::Tips;

#[derive(Debug, Default, Clone)]
pub struct Tree {
    /// Arena storage for all nodes
    pub(super) nodes: Vec<Node>,

    /// Optional root ID (a tree might be empty or in construction)
    pub(super) root: Option<NodeId>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new node to the tree. Returns the new node's ID.
    /// The node is initially detached (no parent).
    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        let node = Node::new(id);
        self.nodes.push(node);
        id
    }

    /// Get number of nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| !n.deleted).count()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get root ID
    pub fn get_root(&self) -> Option<NodeId> {
        self.root
    }

    /// Get a reference to a node by ID.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).filter(|n| !n.deleted)
    }

    /// Get a mutable reference to a node by ID.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).filter(|n| !n.deleted)
    }

    /// Like `get_node`, but a missing node is an error.
    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.get_node(id).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.get_node_mut(id).ok_or(TreeError::NodeNotFound(id))
    }

    /// Iterate over all live nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.deleted)
    }

    /// Set a node as the root of the tree.
    pub fn set_root(&mut self, id: NodeId) {
        if self.get_node(id).is_some() {
            self.root = Some(id);
        }
    }

    /// Root ID, or an error for an empty tree.
    pub fn root_id(&self) -> Result<NodeId, TreeError> {
        self.root
            .ok_or_else(|| TreeError::LogicError("Tree has no root".to_string()))
    }

    // --- Delegation to ops ---

    pub fn attach(&mut self, id: NodeId, parent_id: NodeId) -> Result<(), TreeError> {
        ops::attach(self, id, parent_id)
    }

    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        ops::detach(self, id)
    }

    pub fn create_internal(&mut self, children: &[NodeId]) -> Result<NodeId, TreeError> {
        ops::create_internal(self, children)
    }

    pub fn create_external(&mut self, taxon: &str) -> NodeId {
        ops::create_external(self, taxon)
    }

    pub fn remove_node(&mut self, id: NodeId, recursive: bool) {
        ops::remove_node(self, id, recursive)
    }

    pub fn contract_edge(&mut self, id: NodeId) -> Result<(), TreeError> {
        ops::contract_edge(self, id)
    }

    pub fn splice_node(&mut self, id: NodeId) -> Result<(), TreeError> {
        ops::splice_node(self, id)
    }

    pub fn collapse_below(&mut self, threshold: f64) -> Result<usize, TreeError> {
        ops::collapse_below(self, threshold)
    }

    pub fn scale(&mut self, factor: f64) -> Result<(), TreeError> {
        ops::scale(self, factor)
    }

    pub fn scale_to_height(&mut self, height: f64) -> Result<f64, TreeError> {
        ops::scale_to_height(self, height)
    }

    pub fn compact(&mut self) {
        ops::compact(self)
    }

    pub fn insert_parent(&mut self, id: NodeId, offset: f64) -> Result<NodeId, TreeError> {
        ops::insert_parent(self, id, offset)
    }

    pub fn split_edge_and_insert(
        &mut self,
        tip: NodeId,
        new_taxa: &[String],
    ) -> Result<NodeId, TreeError> {
        ops::split_edge_and_insert(self, tip, new_taxa)
    }

    pub fn insert_tips(
        &mut self,
        insertions: &BTreeMap<String, Vec<String>>,
        policy: MissingPolicy,
    ) -> Result<InsertReport, TreeError> {
        ops::insert_tips(self, insertions, policy)
    }

    pub fn induce_subtree<S: AsRef<str>>(
        &self,
        keep_taxa: &[S],
        policy: MissingPolicy,
    ) -> Result<(Tree, usize), TreeError> {
        ops::induce_subtree(self, keep_taxa, policy)
    }

    pub fn induce_subtree_ids(&self, tips: &[NodeId]) -> Result<Tree, TreeError> {
        ops::induce_subtree_ids(self, tips)
    }

    pub fn reroot_at(&mut self, new_root_id: NodeId) -> Result<(), TreeError> {
        ops::reroot_at(self, new_root_id)
    }

    pub fn remove_degree_two_nodes(&mut self) {
        ops::remove_degree_two_nodes(self)
    }

    pub fn reorder(&mut self, order: Order) {
        ops::reorder(self, order)
    }

    // --- Delegation to reroot ---

    pub fn reroot_outgroup<S: AsRef<str>>(
        &mut self,
        outgroup: &[S],
        fraction: f64,
    ) -> Result<NodeId, TreeError> {
        reroot::reroot_outgroup(self, outgroup, fraction)
    }

    pub fn reroot_midpoint(&mut self) -> Result<NodeId, TreeError> {
        reroot::reroot_midpoint(self)
    }

    pub fn diameter(&self) -> Result<(NodeId, NodeId, f64), TreeError> {
        reroot::diameter(self)
    }

    // --- Delegation to partition ---

    pub fn annotate_monophyletic(
        &mut self,
        attr: &str,
        value: &str,
        hierarchical: bool,
        out_attr: &str,
    ) -> Result<Vec<NodeId>, TreeError> {
        partition::annotate_monophyletic(self, attr, value, hierarchical, out_attr)
    }

    pub fn annotate_all(
        &mut self,
        attr: &str,
        hierarchical: bool,
        out_attr: &str,
    ) -> Result<Vec<String>, TreeError> {
        partition::annotate_all(self, attr, hierarchical, out_attr)
    }

    pub fn collect_tip_values(&self, attr: &str) -> BTreeMap<String, Vec<NodeId>> {
        partition::collect_tip_values(self, attr)
    }

    pub fn split_by_value(&self, out_attr: &str, value: &str) -> Result<Vec<Tree>, TreeError> {
        partition::split_by_value(self, out_attr, value)
    }

    // --- Delegation to traversal ---

    pub fn preorder(&self, start_node: NodeId) -> Vec<NodeId> {
        traversal::preorder(self, start_node)
    }

    pub fn postorder(&self, start_node: NodeId) -> Vec<NodeId> {
        traversal::postorder(self, start_node)
    }

    pub fn levelorder(&self, start_node: NodeId) -> Vec<NodeId> {
        traversal::levelorder(self, start_node)
    }

    pub fn tips(&self, start_node: NodeId) -> Tips<'_> {
        traversal::tips(self, start_node)
    }

    pub fn extract_subtree(&self, root_id: NodeId) -> Result<Tree, TreeError> {
        traversal::extract_subtree(self, root_id)
    }

    // --- Delegation to query ---

    pub fn get_path_from_root(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        query::get_path_from_root(self, id)
    }

    pub fn get_common_ancestor(&self, a: NodeId, b: NodeId) -> Result<NodeId, TreeError> {
        query::get_common_ancestor(self, a, b)
    }

    pub fn get_distance(&self, a: NodeId, b: NodeId) -> Result<(f64, usize), TreeError> {
        query::get_distance(self, a, b)
    }

    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        query::is_descendant(self, id, ancestor)
    }

    pub fn mrca(&self, nodes: &[NodeId]) -> Result<NodeId, TreeError> {
        query::mrca(self, nodes)
    }

    pub fn tip_count(&self, id: NodeId) -> usize {
        query::tip_count(self, id)
    }

    pub fn height(&self, id: NodeId) -> f64 {
        query::height(self, id)
    }

    pub fn average_tip_distance(&self, id: NodeId) -> f64 {
        query::average_tip_distance(self, id)
    }

    pub fn tmrca(&self, nodes: &[NodeId], stem: bool) -> Result<f64, TreeError> {
        query::tmrca(self, nodes, stem)
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeId> {
        query::get_node_by_name(self, name)
    }

    pub fn tip_map(&self) -> BTreeMap<String, NodeId> {
        query::tip_map(self)
    }

    pub fn resolve_taxa<S: AsRef<str>>(
        &self,
        names: &[S],
        policy: MissingPolicy,
    ) -> Result<(Vec<NodeId>, Vec<String>), TreeError> {
        query::resolve_taxa(self, names, policy)
    }

    // --- Delegation to stat ---

    pub fn get_leaves(&self) -> Vec<NodeId> {
        match self.root {
            Some(root) => self.tips(root).collect(),
            None => Vec::new(),
        }
    }

    pub fn get_leaf_names(&self) -> Vec<Option<String>> {
        self.get_leaves()
            .into_iter()
            .map(|id| self.nodes[id].name.clone())
            .collect()
    }

    pub fn get_leaf_name_set(&self) -> BTreeSet<String> {
        self.get_leaf_names().into_iter().flatten().collect()
    }

    pub fn is_binary(&self) -> bool {
        stat::is_binary(self)
    }

    pub fn is_ultrametric(&self, epsilon: f64) -> bool {
        stat::is_ultrametric(self, epsilon)
    }

    pub fn stats(&self) -> Result<TreeStats, TreeError> {
        stat::stats(self)
    }

    // --- Delegation to io ---

    pub fn from_file(infile: &str) -> anyhow::Result<Vec<Tree>> {
        io::from_file(infile)
    }

    pub fn to_newick(&self) -> String {
        io::to_newick(self)
    }

    pub fn to_newick_subtree(&self, root: NodeId) -> String {
        io::to_newick_subtree(self, root, "")
    }

    pub fn to_newick_with_format(&self, indent: &str) -> String {
        io::to_newick_with_format(self, indent)
    }
}
