//! Tree construction utilities.
//!
//! Every parser funnels through [`build_from_parents`], so a
//! [`MorphologyTree`] either satisfies all structural invariants or is never
//! created.

use super::index::NodeId;
use super::morphology::{MorphologyTree, Node};
use super::region::RegionCatalog;
use crate::error::{MorphError, Result};

/// Build a tree from node records and zero-based parent indices.
///
/// # Arguments
/// * `name` - Tree name
/// * `nodes` - Node records; index 0 is the root
/// * `parents` - Parent of each node, `None` only for the root
/// * `catalog` - Region catalog referenced by the nodes
///
/// # Returns
/// A validated tree, or an error describing the first violated invariant.
///
/// # Example
/// ```
/// use dendron::tree::{build_from_parents, Node, RegionCatalog};
/// use nalgebra::Point3;
///
/// let mut catalog = RegionCatalog::new();
/// let soma = catalog.get_or_insert("soma");
/// let nodes = vec![
///     Node::new(Point3::new(0.0, 0.0, 0.0), 10.0, soma),
///     Node::new(Point3::new(0.0, 5.0, 0.0), 2.0, soma),
/// ];
///
/// let tree = build_from_parents("cell", nodes, &[None, Some(0)], catalog).unwrap();
/// assert_eq!(tree.num_nodes(), 2);
/// ```
pub fn build_from_parents(
    name: impl Into<String>,
    nodes: Vec<Node>,
    parents: &[Option<usize>],
    catalog: RegionCatalog,
) -> Result<MorphologyTree> {
    let n = nodes.len();
    if n == 0 {
        return Err(MorphError::EmptyTree);
    }
    if parents.len() != n {
        return Err(MorphError::AttributeMismatch {
            nodes: n,
            parents: parents.len(),
        });
    }

    // Validate parent references
    if let Some(p) = parents[0] {
        return Err(MorphError::InvalidParent {
            node: 0,
            parent: p as i64,
        });
    }
    let mut links = Vec::with_capacity(n);
    links.push(None);
    for (i, parent) in parents.iter().enumerate().skip(1) {
        match *parent {
            Some(p) if p < n && p != i => links.push(Some(NodeId::new(p))),
            Some(p) => {
                return Err(MorphError::InvalidParent {
                    node: i,
                    parent: p as i64,
                })
            }
            // A second parentless node would make this a forest
            None => return Err(MorphError::InvalidParent { node: i, parent: -1 }),
        }
    }

    for (i, node) in nodes.iter().enumerate() {
        if !catalog.contains(node.region) {
            return Err(MorphError::UnknownRegion {
                node: i,
                region: node.region.index(),
            });
        }
    }

    check_reaches_root(&links)?;

    Ok(MorphologyTree {
        name: name.into(),
        nodes,
        parents: links,
        catalog,
    })
}

/// Verify that every node reaches the root by following parents.
///
/// Each node is walked at most once: a walk stops at the first node already
/// known to reach the root, and a node revisited within the current walk
/// closes a cycle.
fn check_reaches_root(parents: &[Option<NodeId>]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unseen,
        InWalk,
        Rooted,
    }

    let mut marks = vec![Mark::Unseen; parents.len()];
    marks[0] = Mark::Rooted;
    let mut walk = Vec::new();

    for start in 1..parents.len() {
        let mut current = start;
        while marks[current] == Mark::Unseen {
            marks[current] = Mark::InWalk;
            walk.push(current);
            match parents[current] {
                Some(p) => current = p.index(),
                None => break,
            }
        }
        if marks[current] == Mark::InWalk {
            return Err(MorphError::CyclicTopology { node: current });
        }
        for &v in &walk {
            marks[v] = Mark::Rooted;
        }
        walk.clear();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn nodes(n: usize) -> (Vec<Node>, RegionCatalog) {
        let mut catalog = RegionCatalog::new();
        let r = catalog.get_or_insert("1");
        let nodes = (0..n)
            .map(|i| Node::new(Point3::new(i as f64, 0.0, 0.0), 1.0, r))
            .collect();
        (nodes, catalog)
    }

    #[test]
    fn test_valid_tree_invariants() {
        let (nodes, catalog) = nodes(5);
        let parents = [None, Some(0), Some(1), Some(1), Some(3)];
        let tree = build_from_parents("t", nodes, &parents, catalog).unwrap();

        assert_eq!(tree.num_nodes(), tree.num_edges() + 1);
        let parentless: Vec<_> = tree.node_ids().filter(|&v| tree.parent(v).is_none()).collect();
        assert_eq!(parentless, vec![NodeId::ROOT]);
    }

    #[test]
    fn test_children_may_precede_parents() {
        let (nodes, catalog) = nodes(3);
        let parents = [None, Some(2), Some(0)];
        assert!(build_from_parents("t", nodes, &parents, catalog).is_ok());
    }

    #[test]
    fn test_empty() {
        let result = build_from_parents("t", Vec::new(), &[], RegionCatalog::new());
        assert!(matches!(result, Err(MorphError::EmptyTree)));
    }

    #[test]
    fn test_length_mismatch() {
        let (nodes, catalog) = nodes(2);
        let result = build_from_parents("t", nodes, &[None], catalog);
        assert!(matches!(result, Err(MorphError::AttributeMismatch { nodes: 2, parents: 1 })));
    }

    #[test]
    fn test_root_with_parent() {
        let (nodes, catalog) = nodes(2);
        let result = build_from_parents("t", nodes, &[Some(1), Some(0)], catalog);
        assert!(matches!(result, Err(MorphError::InvalidParent { node: 0, .. })));
    }

    #[test]
    fn test_second_root() {
        let (nodes, catalog) = nodes(3);
        let result = build_from_parents("t", nodes, &[None, Some(0), None], catalog);
        assert!(matches!(result, Err(MorphError::InvalidParent { node: 2, parent: -1 })));
    }

    #[test]
    fn test_out_of_range_and_self_parent() {
        let (n, c) = nodes(3);
        let result = build_from_parents("t", n, &[None, Some(0), Some(3)], c);
        assert!(matches!(result, Err(MorphError::InvalidParent { node: 2, parent: 3 })));

        let (n, c) = nodes(3);
        let result = build_from_parents("t", n, &[None, Some(1), Some(0)], c);
        assert!(matches!(result, Err(MorphError::InvalidParent { node: 1, parent: 1 })));
    }

    #[test]
    fn test_cycle_rejected() {
        let (nodes, catalog) = nodes(4);
        // 1 -> 2 -> 3 -> 1, none reaches the root
        let parents = [None, Some(2), Some(3), Some(1)];
        let result = build_from_parents("t", nodes, &parents, catalog);
        assert!(matches!(result, Err(MorphError::CyclicTopology { .. })));
    }

    #[test]
    fn test_unknown_region() {
        let (mut nodes, catalog) = nodes(2);
        nodes[1].region = crate::tree::RegionId::new(4);
        let result = build_from_parents("t", nodes, &[None, Some(0)], catalog);
        assert!(matches!(result, Err(MorphError::UnknownRegion { node: 1, region: 4 })));
    }
}
