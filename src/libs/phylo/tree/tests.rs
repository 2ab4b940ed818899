use super::*;
use crate::libs::phylo::node::AttrValue;
use approx::assert_abs_diff_eq;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

// ------------------------------------------------------------------
// helpers
// ------------------------------------------------------------------

fn nwk(s: &str) -> Tree {
    Tree::from_newick(s).unwrap()
}

fn id(tree: &Tree, name: &str) -> NodeId {
    tree.get_node_by_name(name).unwrap()
}

fn tip_names(tree: &Tree) -> Vec<String> {
    tree.get_leaf_names().into_iter().flatten().collect()
}

/// Random rooted tree with tips T0..Tn. Internal nodes have 2 or 3
/// children; lengths are multiples of 0.1 so that ties and zeros occur.
fn random_tree(rng: &mut SmallRng, n_tips: usize) -> Tree {
    let mut tree = Tree::new();
    let mut pool: Vec<NodeId> = (0..n_tips)
        .map(|i| tree.create_external(&format!("T{}", i)))
        .collect();

    while pool.len() > 1 {
        let k = if pool.len() > 2 && rng.gen_bool(0.2) { 3 } else { 2 };
        pool.shuffle(rng);
        let children: Vec<NodeId> = pool.drain(..k).collect();
        for &c in &children {
            tree.get_node_mut(c).unwrap().length = Some(rng.gen_range(0..10) as f64 / 10.0);
        }
        let parent = tree.create_internal(&children).unwrap();
        pool.push(parent);
    }
    tree.set_root(pool[0]);
    tree
}

/// Patristic distance for every pair of named tips.
fn pairwise(tree: &Tree) -> BTreeMap<(String, String), f64> {
    let tips = tree.tip_map();
    let mut result = BTreeMap::new();
    for (a, &ia) in &tips {
        for (b, &ib) in &tips {
            if a < b {
                let (d, _) = tree.get_distance(ia, ib).unwrap();
                result.insert((a.clone(), b.clone()), d);
            }
        }
    }
    result
}

/// Order-free description of the rooted topology with branch lengths.
fn canonical(tree: &Tree, id: NodeId) -> String {
    let node = tree.get_node(id).unwrap();
    let len = format!("{:.6}", node.edge());
    if node.children.is_empty() {
        return format!("{}:{}", node.name.clone().unwrap_or_default(), len);
    }
    let mut parts: Vec<String> = node.children.iter().map(|&c| canonical(tree, c)).collect();
    parts.sort();
    format!("({}):{}", parts.join(","), len)
}

fn assert_valid(tree: &Tree) {
    let root = tree.get_root().unwrap();
    let parentless: Vec<NodeId> = tree.nodes().filter(|n| n.parent.is_none()).map(|n| n.id).collect();
    assert_eq!(parentless, vec![root]);

    for node in tree.nodes() {
        for &c in &node.children {
            assert_eq!(tree.get_node(c).unwrap().parent, Some(node.id));
        }
        if let Some(len) = node.length {
            assert!(len >= 0.0, "negative length on node {}", node.id);
        }
    }
    assert_eq!(tree.preorder(root).len(), tree.len());

    let names = tip_names(tree);
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(names.len(), unique.len());
}

// ------------------------------------------------------------------
// store and traversal
// ------------------------------------------------------------------

#[test]
fn test_tree_traversals() {
    let mut tree = Tree::new();
    //    0
    //   / \
    //  1   2
    // / \   \
    //3   4   5
    let n0 = tree.add_node();
    let n1 = tree.add_node();
    let n2 = tree.add_node();
    let n3 = tree.add_node();
    let n4 = tree.add_node();
    let n5 = tree.add_node();

    tree.set_root(n0);
    tree.attach(n1, n0).unwrap();
    tree.attach(n2, n0).unwrap();
    tree.attach(n3, n1).unwrap();
    tree.attach(n4, n1).unwrap();
    tree.attach(n5, n2).unwrap();

    assert_eq!(tree.preorder(n0), vec![n0, n1, n3, n4, n2, n5]);
    assert_eq!(tree.postorder(n0), vec![n3, n4, n1, n5, n2, n0]);
    assert_eq!(tree.levelorder(n0), vec![n0, n1, n2, n3, n4, n5]);

    // restartable
    assert_eq!(tree.tips(n0).collect::<Vec<_>>(), vec![n3, n4, n5]);
    assert_eq!(tree.tips(n0).count(), 3);
    assert_eq!(tree.tips(n1).collect::<Vec<_>>(), vec![n3, n4]);
    assert_eq!(tree.tips(n5).collect::<Vec<_>>(), vec![n5]);
}

#[test]
fn test_tree_remove_and_compact() {
    let mut tree = Tree::new();
    // 0 -> 1 -> 2
    let n0 = tree.add_node();
    let n1 = tree.add_node();
    let n2 = tree.add_node();

    tree.set_root(n0);
    tree.attach(n1, n0).unwrap();
    tree.attach(n2, n1).unwrap();

    // n2 becomes an orphan
    tree.remove_node(n1, false);

    assert!(tree.get_node(n1).is_none());
    assert_eq!(tree.len(), 2);
    assert!(!tree.get_node(n0).unwrap().children.contains(&n1));
    assert_eq!(tree.get_node(n2).unwrap().parent, None);

    tree.compact();

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.get_root(), Some(0));
    assert_eq!(tree.get_node(0).unwrap().children.len(), 0);
    assert_eq!(tree.get_node(1).unwrap().parent, None);
}

#[test]
fn test_remove_recursive() {
    let mut tree = nwk("((A,B)X,C);");
    let x = id(&tree, "X");
    tree.remove_node(x, true);
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.to_newick(), "(C);");
}

#[test]
fn test_tree_paths_and_distances() {
    let tree = nwk("((n3:3,n4:4)n1:1,n2:2)n0;");
    let (n0, n1, n2, n3, n4) = (
        id(&tree, "n0"),
        id(&tree, "n1"),
        id(&tree, "n2"),
        id(&tree, "n3"),
        id(&tree, "n4"),
    );

    assert_eq!(tree.get_path_from_root(n3).unwrap(), vec![n0, n1, n3]);
    assert_eq!(tree.get_path_from_root(n2).unwrap(), vec![n0, n2]);

    assert_eq!(tree.get_common_ancestor(n3, n4).unwrap(), n1);
    assert_eq!(tree.get_common_ancestor(n3, n2).unwrap(), n0);
    assert_eq!(tree.get_common_ancestor(n1, n3).unwrap(), n1);

    assert_eq!(tree.get_distance(n3, n4).unwrap(), (7.0, 2));
    assert_eq!(tree.get_distance(n3, n2).unwrap(), (6.0, 3));
    assert_eq!(tree.get_distance(n1, n1).unwrap(), (0.0, 0));
}

#[test]
fn test_heights() {
    let tree = nwk("((A:1,B:2):3,C:4);");
    let root = tree.get_root().unwrap();
    let ab = tree.get_node(id(&tree, "A")).unwrap().parent.unwrap();

    assert_abs_diff_eq!(tree.height(root), 5.0);
    assert_abs_diff_eq!(tree.height(ab), 2.0);
    assert_abs_diff_eq!(tree.height(id(&tree, "A")), 0.0);
    assert_abs_diff_eq!(tree.average_tip_distance(root), 13.0 / 3.0);
    assert_eq!(tree.tip_count(root), 3);
    assert_eq!(tree.tip_count(ab), 2);
}

#[test]
fn test_mrca_and_tmrca() {
    let tree = nwk("((A:1,B:1):2,(C:1,D:2):0.5);");
    let (a, b, c) = (id(&tree, "A"), id(&tree, "B"), id(&tree, "C"));
    let ab = tree.get_node(a).unwrap().parent.unwrap();

    assert_eq!(tree.mrca(&[a, b]).unwrap(), ab);
    assert_eq!(tree.mrca(&[a]).unwrap(), a);
    assert_eq!(tree.mrca(&[a, b, c]).unwrap(), tree.get_root().unwrap());
    assert!(matches!(tree.mrca(&[]), Err(TreeError::LogicError(_))));
    assert!(matches!(tree.mrca(&[a, 99]), Err(TreeError::NodeNotFound(99))));

    assert_abs_diff_eq!(tree.tmrca(&[a, b], false).unwrap(), 1.0);
    assert_abs_diff_eq!(tree.tmrca(&[a, b], true).unwrap(), 3.0);
    // the root has no stem
    assert_abs_diff_eq!(tree.tmrca(&[a, c], true).unwrap(), 3.0);
}

#[test]
fn test_resolve_taxa() {
    let tree = nwk("(A,B,C);");
    let (ids, missing) = tree
        .resolve_taxa(&["C", "Z", "A", "C"], MissingPolicy::Skip)
        .unwrap();
    assert_eq!(ids, vec![id(&tree, "C"), id(&tree, "A")]);
    assert_eq!(missing, vec!["Z"]);

    let err = tree.resolve_taxa(&["Z"], MissingPolicy::Fail).unwrap_err();
    assert_eq!(err, TreeError::MissingTaxon("Z".to_string()));
}

// ------------------------------------------------------------------
// editor
// ------------------------------------------------------------------

#[test]
fn test_attach_and_detach() {
    let mut tree = nwk("((A,B)X,C);");
    let (x, a, c) = (id(&tree, "X"), id(&tree, "A"), id(&tree, "C"));
    let root = tree.get_root().unwrap();

    assert_eq!(tree.detach(root), Err(TreeError::RootDetach(root)));
    assert_eq!(
        tree.attach(x, a),
        Err(TreeError::Cycle { node: x, parent: a })
    );
    assert_eq!(tree.attach(x, x), Err(TreeError::Cycle { node: x, parent: x }));
    assert_eq!(
        tree.attach(c, x),
        Err(TreeError::AlreadyAttached { node: c, parent: root })
    );

    tree.detach(c).unwrap();
    assert_eq!(tree.get_node(c).unwrap().parent, None);
    tree.attach(c, x).unwrap();
    assert_eq!(tree.to_newick(), "((A,B,C)X);");
}

#[test]
fn test_create_nodes() {
    let mut tree = Tree::new();
    let a = tree.create_external("A");
    let b = tree.create_external("B");
    let ab = tree.create_internal(&[a, b]).unwrap();
    tree.set_root(ab);
    assert_eq!(tree.to_newick(), "(A,B);");

    let c = tree.create_external("C");
    assert!(matches!(
        tree.create_internal(&[a, c]),
        Err(TreeError::AlreadyAttached { .. })
    ));
    assert!(matches!(
        tree.create_internal(&[c, c]),
        Err(TreeError::LogicError(_))
    ));
    // nothing was linked by the failed calls
    assert_eq!(tree.get_node(c).unwrap().parent, None);
}

#[test]
fn test_contract_and_splice() {
    let mut tree = nwk("((A:1,B:2)X:3,C:4);");
    let x = id(&tree, "X");
    tree.contract_edge(x).unwrap();
    assert_eq!(tree.to_newick(), "(A:1,B:2,C:4);");

    let mut tree = nwk("((A:1,B:2)X:3,C:4);");
    let x = id(&tree, "X");
    tree.splice_node(x).unwrap();
    assert_eq!(tree.to_newick(), "(A:4,B:5,C:4);");

    let root = tree.get_root().unwrap();
    assert!(matches!(tree.contract_edge(root), Err(TreeError::LogicError(_))));
    let a = id(&tree, "A");
    assert!(matches!(tree.contract_edge(a), Err(TreeError::LogicError(_))));
}

#[test]
fn test_collapse_below_strict_threshold() {
    // a zero threshold is rejected and the zero-length branch survives
    let mut tree = nwk("((A:1,B:1):0,(C:1,D:1):0.5);");
    assert!(matches!(
        tree.collapse_below(0.0),
        Err(TreeError::InvalidFactor { .. })
    ));
    assert_eq!(tree.to_newick(), "((A:1,B:1):0,(C:1,D:1):0.5);");

    // 0.5 is not < 0.5
    assert_eq!(tree.collapse_below(0.5).unwrap(), 1);
    assert_eq!(tree.to_newick(), "(A:1,B:1,(C:1,D:1):0.5);");

    assert_eq!(tree.collapse_below(0.6).unwrap(), 1);
    assert_eq!(tree.to_newick(), "(A:1,B:1,C:1,D:1);");

    assert!(matches!(
        tree.collapse_below(-1.0),
        Err(TreeError::InvalidFactor { .. })
    ));
    assert!(matches!(
        tree.collapse_below(f64::NAN),
        Err(TreeError::InvalidFactor { .. })
    ));
}

#[test]
fn test_collapse_nested() {
    let mut tree = nwk("(((A:1,B:1):0.1,C:1):0.1,D:1);");
    assert_eq!(tree.collapse_below(0.2).unwrap(), 2);
    assert_eq!(tree.to_newick(), "(A:1,B:1,C:1,D:1);");
}

#[test]
fn test_scale() {
    let mut tree = nwk("((A:1,B:2):3,C);");
    tree.scale(2.0).unwrap();
    assert_eq!(tree.to_newick(), "((A:2,B:4):6,C);");

    for bad in [0.0, -1.0, f64::INFINITY] {
        assert!(matches!(tree.scale(bad), Err(TreeError::InvalidFactor { .. })));
    }
    assert_eq!(tree.to_newick(), "((A:2,B:4):6,C);");

    let mut tree = nwk("(A:1,B:3);");
    let factor = tree.scale_to_height(10.0).unwrap();
    assert_abs_diff_eq!(factor, 5.0);
    assert_eq!(tree.to_newick(), "(A:5,B:15);");

    let mut flat = nwk("(A:0,B:0);");
    assert!(matches!(
        flat.scale_to_height(1.0),
        Err(TreeError::InvalidFactor { .. })
    ));
}

#[test]
fn test_insert_parent() {
    let mut tree = nwk("((A:1,B:2):3,C:4);");
    let c = id(&tree, "C");
    let p = tree.insert_parent(c, 1.5).unwrap();
    assert_eq!(tree.get_node(p).unwrap().length, Some(1.5));
    assert_eq!(tree.to_newick(), "((A:1,B:2):3,(C:2.5):1.5);");

    assert!(matches!(
        tree.insert_parent(c, 5.0),
        Err(TreeError::InvalidFactor { .. })
    ));
    let root = tree.get_root().unwrap();
    assert!(matches!(tree.insert_parent(root, 0.0), Err(TreeError::LogicError(_))));
}

#[test]
fn test_split_edge_and_insert() {
    let mut tree = nwk("((A:1,B:2):3,C:4);");
    let b = id(&tree, "B");
    let new_taxa = vec!["X".to_string(), "Y".to_string()];
    let polytomy = tree.split_edge_and_insert(b, &new_taxa).unwrap();
    assert_eq!(tree.to_newick(), "((A:1,(B:0,X:0,Y:0):2):3,C:4);");
    assert_eq!(tree.get_node(polytomy).unwrap().children.len(), 3);

    // zero-length tip joins its parent's polytomy
    let mut tree = nwk("((A:1,B:0):3,C:4);");
    let b = id(&tree, "B");
    tree.split_edge_and_insert(b, &["X".to_string()]).unwrap();
    assert_eq!(tree.to_newick(), "((A:1,B:0,X:0):3,C:4);");

    // duplicate taxon leaves the tree untouched
    let before = tree.to_newick();
    let c = id(&tree, "C");
    assert_eq!(
        tree.split_edge_and_insert(c, &["A".to_string()]),
        Err(TreeError::DuplicateTaxon("A".to_string()))
    );
    assert_eq!(tree.to_newick(), before);
}

#[test]
fn test_insert_tips_policy() {
    let mut insertions = BTreeMap::new();
    insertions.insert("A".to_string(), vec!["A2".to_string()]);
    insertions.insert("Z".to_string(), vec!["Z1".to_string(), "Z2".to_string()]);

    let mut tree = nwk("((A:1,B:2):3,C:4);");
    let before = tree.to_newick();
    assert_eq!(
        tree.insert_tips(&insertions, MissingPolicy::Fail),
        Err(TreeError::MissingTaxon("Z".to_string()))
    );
    assert_eq!(tree.to_newick(), before);

    let report = tree.insert_tips(&insertions, MissingPolicy::Skip).unwrap();
    assert_eq!(
        report,
        InsertReport {
            inserted: 1,
            destinations: 1,
            skipped: 2
        }
    );
    assert_eq!(tree.to_newick(), "(((A:0,A2:0):1,B:2):3,C:4);");
    assert_valid(&tree);
}

#[test]
fn test_induce_subtree() {
    let tree = nwk("((A:1,B:2):3,(C:4,(D:5,E:6):7):8);");

    let (sub, skipped) = tree.induce_subtree(&["A", "D", "E"], MissingPolicy::Fail).unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(sub.to_newick(), "(A:4,(D:5,E:6):15);");
    assert_valid(&sub);

    // the original is untouched
    assert_eq!(tree.get_leaves().len(), 5);

    let (sub, skipped) = tree
        .induce_subtree(&["D", "E", "Q"], MissingPolicy::Skip)
        .unwrap();
    assert_eq!(skipped, 1);
    assert_eq!(sub.to_newick(), "(D:5,E:6);");

    assert_eq!(
        tree.induce_subtree(&["A"], MissingPolicy::Fail).unwrap_err(),
        TreeError::InsufficientTaxa(1)
    );
    assert_eq!(
        tree.induce_subtree(&["A", "Q"], MissingPolicy::Fail).unwrap_err(),
        TreeError::MissingTaxon("Q".to_string())
    );
}

#[test]
fn test_prune_to_two_tips() {
    let tree = nwk("((A:1,B:2):3,(C:4,(D:5,E:6):7):8);");
    let expected = tree.get_distance(id(&tree, "A"), id(&tree, "E")).unwrap().0;

    let (sub, _) = tree.induce_subtree(&["A", "E"], MissingPolicy::Fail).unwrap();
    assert_eq!(sub.get_leaves().len(), 2);
    let (d, topo) = sub.get_distance(id(&sub, "A"), id(&sub, "E")).unwrap();
    assert_eq!(topo, 2);
    assert_abs_diff_eq!(d, expected);
    assert_abs_diff_eq!(d, 25.0);
}

#[test]
fn test_extract_subtree() {
    let tree = nwk("((A:1,B:2)X:3,C:4);");
    let sub = tree.extract_subtree(id(&tree, "X")).unwrap();
    assert_eq!(sub.to_newick(), "(A:1,B:2)X:3;");
    assert!(tree.extract_subtree(42).is_err());
}

#[test]
fn test_reorder() {
    let mut tree = nwk("((A,(B,C)),D);");
    tree.reorder(Order::Increasing);
    assert_eq!(tree.to_newick(), "(D,(A,(B,C)));");
    tree.reorder(Order::Decreasing);
    assert_eq!(tree.to_newick(), "(((B,C),A),D);");
}

#[test]
fn test_remove_degree_two_nodes() {
    let mut tree = nwk("(((A:1):2,B:1):1,((C:1):1):1);");
    tree.remove_degree_two_nodes();
    assert_eq!(tree.to_newick(), "((A:3,B:1):1,C:3);");
}

// ------------------------------------------------------------------
// rerooting
// ------------------------------------------------------------------

#[test]
fn test_reroot_outgroup_half() {
    let mut tree = nwk("((A:1,B:2):3,C:4);");
    let new_root = tree.reroot_outgroup(&["C"], 0.5).unwrap();
    assert_eq!(tree.get_root(), Some(new_root));
    assert_eq!(tree.to_newick(), "(C:2,(A:1,B:2):5);");
    assert_valid(&tree);
}

#[test]
fn test_reroot_outgroup_deep() {
    let mut tree = nwk("((A:1,(B:2,C:3):4):5,D:6);");
    let before = pairwise(&tree);
    tree.reroot_outgroup(&["B", "C"], 0.25).unwrap();
    assert_eq!(tree.to_newick(), "((B:2,C:3):3,(A:1,D:11):1);");
    assert_valid(&tree);

    let after = pairwise(&tree);
    for (pair, d) in &before {
        assert_abs_diff_eq!(after[pair], *d, epsilon = 1e-9);
    }
}

#[test]
fn test_reroot_outgroup_errors() {
    let mut tree = nwk("((A:1,B:2):3,C:4);");
    assert_eq!(
        tree.reroot_outgroup(&["Q"], 0.5),
        Err(TreeError::UnknownOutgroup("Q".to_string()))
    );
    assert!(matches!(
        tree.reroot_outgroup(&["C"], 1.5),
        Err(TreeError::InvalidFactor { .. })
    ));
    assert!(matches!(
        tree.reroot_outgroup(&["A", "C"], 0.5),
        Err(TreeError::LogicError(_))
    ));
    assert_eq!(tree.to_newick(), "((A:1,B:2):3,C:4);");
}

#[test]
fn test_reroot_unary_root() {
    let mut tree = nwk("((A:1,B:3):2);");
    tree.reroot_midpoint().unwrap();
    tree.compact();
    assert_valid(&tree);
    assert!(tree.nodes().all(|n| n.children.len() != 1));
    assert_eq!(tree.to_newick(), "(B:2,A:2);");

    let mut tree = nwk("((A:1,B:3):2);");
    tree.reroot_outgroup(&["A"], 0.5).unwrap();
    tree.compact();
    assert!(tree.nodes().all(|n| n.children.len() != 1));
    assert_eq!(tree.to_newick(), "(A:0.5,B:3.5);");
}

#[test]
fn test_reroot_midpoint() {
    let mut tree = nwk("((A:1,B:2):3,C:10);");
    let (a, b, d) = tree.diameter().unwrap();
    assert_abs_diff_eq!(d, 15.0);
    let ends: HashSet<NodeId> = [a, b].into_iter().collect();
    assert_eq!(ends, [id(&tree, "B"), id(&tree, "C")].into_iter().collect());

    tree.reroot_midpoint().unwrap();
    assert_valid(&tree);
    assert_eq!(tree.to_newick(), "(C:7.5,(A:1,B:2):5.5);");

    let mut single = nwk("(A:1);");
    assert_eq!(
        single.reroot_midpoint(),
        Err(TreeError::InsufficientTaxa(1))
    );
}

#[test]
fn test_reroot_at() {
    let mut tree = nwk("((A:1,B:2)X:3,C:4)R;");
    let x = id(&tree, "X");
    tree.reroot_at(x).unwrap();
    assert_eq!(tree.to_newick(), "(A:1,B:2,(C:4)R:3)X;");
    assert_valid(&tree);
}

// ------------------------------------------------------------------
// partition
// ------------------------------------------------------------------

fn set_tip_values(tree: &mut Tree, attr: &str, values: &[(&str, &str)]) {
    for (name, value) in values {
        let tip = tree.get_node_by_name(name).unwrap();
        tree.get_node_mut(tip).unwrap().set_attribute(attr, *value);
    }
}

#[test]
fn test_split_two_clades() {
    let mut tree = nwk("(((A:1,B:1):1,C:2):1,(D:1,E:1):2);");
    set_tip_values(
        &mut tree,
        "lineage",
        &[("A", "X"), ("B", "X"), ("C", "X"), ("D", "Y"), ("E", "Y")],
    );

    let values = tree.annotate_all("lineage", false, "clade").unwrap();
    assert_eq!(values, vec!["X", "Y"]);

    let x = tree.split_by_value("clade", "X").unwrap();
    let y = tree.split_by_value("clade", "Y").unwrap();
    assert_eq!(x.len() + y.len(), 2);
    assert_eq!(tip_names(&x[0]), vec!["A", "B", "C"]);
    assert_eq!(tip_names(&y[0]), vec!["D", "E"]);
    assert_eq!(x[0].to_newick(), "((A:1,B:1):1,C:2)[&&NHX:clade={X}];");
}

#[test]
fn test_annotate_hierarchical() {
    let mut tree = nwk("(((A,B),C),(D,E));");
    set_tip_values(
        &mut tree,
        "lineage",
        &[
            ("A", "B.1.1"),
            ("B", "B.1.1"),
            ("C", "B.1"),
            ("D", "B.11"),
            ("E", "B.1"),
        ],
    );

    let values = tree.annotate_all("lineage", true, "clade").unwrap();
    assert_eq!(values, vec!["B.1", "B.11", "B.1.1"]);

    let b1 = tree.split_by_value("clade", "B.1").unwrap();
    let names: Vec<Vec<String>> = b1.iter().map(tip_names).collect();
    assert_eq!(names, vec![vec!["A", "B", "C"], vec!["E"]]);

    let b11 = tree.split_by_value("clade", "B.1.1").unwrap();
    assert_eq!(b11.len(), 1);
    assert_eq!(tip_names(&b11[0]), vec!["A", "B"]);

    // a single tip clade is a one-node tree
    let d = tree.split_by_value("clade", "B.11").unwrap();
    assert_eq!(d[0].len(), 1);
    assert_eq!(d[0].get_node(d[0].get_root().unwrap()).unwrap().length, None);

    // annotate_all replaces old tags
    tree.annotate_all("lineage", false, "clade").unwrap();
    assert_eq!(tree.split_by_value("clade", "B.1").unwrap().len(), 2);
    assert!(tree.split_by_value("clade", "B.1").unwrap()[0].len() == 1);
}

#[test]
fn test_tags_accumulate() {
    let mut tree = nwk("((A,B),C);");
    set_tip_values(&mut tree, "lineage", &[("A", "X"), ("B", "X"), ("C", "Y")]);
    tree.annotate_monophyletic("lineage", "X", false, "clade").unwrap();
    let ab = tree.get_node(id(&tree, "A")).unwrap().parent.unwrap();
    tree.get_node_mut(ab).unwrap().add_tag("clade", "Z");

    let tagged = tree.annotate_monophyletic("lineage", "X", false, "clade").unwrap();
    assert_eq!(tagged, vec![ab]);
    let clade = tree.get_node(ab).unwrap().get_attribute("clade").unwrap();
    assert_eq!(clade, &AttrValue::Set(["X", "Z"].iter().map(|s| s.to_string()).collect()));
}

#[test]
fn test_collect_tip_values() {
    let mut tree = nwk("((A,B),C);");
    set_tip_values(&mut tree, "lineage", &[("A", "X"), ("C", "X")]);
    let groups = tree.collect_tip_values("lineage");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups["X"], vec![id(&tree, "A"), id(&tree, "C")]);
}

// ------------------------------------------------------------------
// statistics
// ------------------------------------------------------------------

#[test]
fn test_stats() {
    let tree = nwk("((A:1,B:2):3,C:4);");
    let stats = tree.stats().unwrap();
    assert_eq!(stats.nodes, 5);
    assert_eq!(stats.tips, 3);
    assert!(stats.binary);
    assert!(!stats.ultrametric);
    assert_abs_diff_eq!(stats.root_height, 5.0);
    assert_abs_diff_eq!(stats.max_root_to_tip, 5.0);
    assert_abs_diff_eq!(stats.min_root_to_tip, 4.0);
    assert_abs_diff_eq!(stats.mean_root_to_tip, 13.0 / 3.0);
    assert_eq!(stats.levels, 2);
    assert_abs_diff_eq!(stats.total_length, 10.0);
    assert!(stats.to_tsv().starts_with("nodes\t5\ntips\t3\n"));

    let ultra = nwk("((A:1,B:1):1.00001,C:2);");
    assert!(ultra.is_ultrametric(1e-4));
    assert!(!ultra.is_ultrametric(1e-6));
    assert!(!nwk("(A,B,C);").is_binary());
}

// ------------------------------------------------------------------
// properties on random trees
// ------------------------------------------------------------------

#[test]
fn prop_collapse_order_independent() {
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..50 {
        let tree = random_tree(&mut rng, 15);
        let threshold = rng.gen_range(1..6) as f64 / 10.0;

        let mut batch = tree.clone();
        let n = batch.collapse_below(threshold).unwrap();

        let mut candidates: Vec<NodeId> = tree
            .nodes()
            .filter(|n| n.parent.is_some() && !n.children.is_empty() && n.edge() < threshold)
            .map(|n| n.id)
            .collect();
        assert_eq!(candidates.len(), n);
        candidates.shuffle(&mut rng);

        let mut one_by_one = tree.clone();
        for c in candidates {
            one_by_one.contract_edge(c).unwrap();
        }

        let root = tree.get_root().unwrap();
        assert_eq!(canonical(&batch, root), canonical(&one_by_one, root));
        assert_valid(&batch);
    }
}

#[test]
fn prop_induce_preserves_distances() {
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..50 {
        let tree = random_tree(&mut rng, 12);
        let mut names = tip_names(&tree);
        names.shuffle(&mut rng);
        let k = rng.gen_range(2..=names.len());
        let keep = &names[..k];

        let (sub, skipped) = tree.induce_subtree(keep, MissingPolicy::Fail).unwrap();
        assert_eq!(skipped, 0);
        assert_valid(&sub);

        let mut kept = tip_names(&sub);
        kept.sort();
        let mut expected = keep.to_vec();
        expected.sort();
        assert_eq!(kept, expected);

        // no unary nodes remain below the root
        assert!(sub
            .nodes()
            .all(|n| n.parent.is_none() || n.children.len() != 1));

        let full = pairwise(&tree);
        for (pair, d) in pairwise(&sub) {
            assert_abs_diff_eq!(d, full[&pair], epsilon = 1e-9);
        }
    }
}

#[test]
fn prop_mrca_monotonic() {
    let mut rng = SmallRng::seed_from_u64(13);
    for _ in 0..50 {
        let tree = random_tree(&mut rng, 16);
        let mut tips = tree.get_leaves();
        tips.shuffle(&mut rng);

        let small = rng.gen_range(1..tips.len());
        let large = rng.gen_range(small..=tips.len());
        let inner = tree.mrca(&tips[..small]).unwrap();
        let outer = tree.mrca(&tips[..large]).unwrap();

        assert!(tree.is_descendant(inner, outer));
        for &t in &tips[..large] {
            assert!(tree.is_descendant(t, outer));
        }
    }
}

#[test]
fn prop_reroot_preserves_distances() {
    let mut rng = SmallRng::seed_from_u64(17);
    for _ in 0..50 {
        let tree = random_tree(&mut rng, 10);
        let before = pairwise(&tree);

        let root = tree.get_root().unwrap();
        let candidates: Vec<NodeId> = tree.nodes().map(|n| n.id).filter(|&i| i != root).collect();
        let anchor = *candidates.choose(&mut rng).unwrap();
        let outgroup: Vec<String> = tree
            .tips(anchor)
            .filter_map(|t| tree.get_node(t).unwrap().name.clone())
            .collect();
        let fraction: f64 = rng.gen();

        let mut rerooted = tree.clone();
        rerooted.reroot_outgroup(&outgroup, fraction).unwrap();
        assert_valid(&rerooted);
        for (pair, d) in pairwise(&rerooted) {
            assert_abs_diff_eq!(d, before[&pair], epsilon = 1e-9);
        }

        let mut midpoint = tree.clone();
        let (a, b, d) = midpoint.diameter().unwrap();
        let new_root = midpoint.reroot_midpoint().unwrap();
        assert_valid(&midpoint);
        for (pair, dist) in pairwise(&midpoint) {
            assert_abs_diff_eq!(dist, before[&pair], epsilon = 1e-9);
        }

        let (da, _) = midpoint.get_distance(new_root, a).unwrap();
        let (db, _) = midpoint.get_distance(new_root, b).unwrap();
        assert_abs_diff_eq!(da, db, epsilon = 1e-6);
        assert_abs_diff_eq!(da + db, d, epsilon = 1e-6);
    }
}

#[test]
fn prop_monophyly_matches_brute_force() {
    let lineages = ["A", "A.1", "A.1.2", "A.2", "B"];
    let mut rng = SmallRng::seed_from_u64(19);

    for _ in 0..50 {
        let mut tree = random_tree(&mut rng, 12);
        for tip in tree.get_leaves() {
            let value = *lineages.choose(&mut rng).unwrap();
            tree.get_node_mut(tip).unwrap().set_attribute("lineage", value);
        }
        let hierarchical = rng.gen_bool(0.5);

        for value in lineages {
            let mut tagged_tree = tree.clone();
            tagged_tree
                .annotate_monophyletic("lineage", value, hierarchical, "clade")
                .unwrap();

            let all_compatible = |node: NodeId| {
                tree.tips(node).all(|t| {
                    let v = tree.get_node(t).unwrap().get_attribute("lineage").unwrap();
                    partition::is_compatible(&v.to_string(), value, hierarchical)
                })
            };

            for node in tree.nodes() {
                let expected = all_compatible(node.id)
                    && node.parent.map_or(true, |p| !all_compatible(p));
                let tagged = tagged_tree
                    .get_node(node.id)
                    .unwrap()
                    .get_attribute("clade")
                    .is_some_and(|v| v.has(value));
                assert_eq!(tagged, expected, "node {} value {}", node.id, value);
            }
        }
    }
}
