//! Topological metrics over morphology trees.
//!
//! # Node classification
//!
//! Each node has a structural role ([`NodeType`]): a terminal has no children,
//! a continuation has one, a branch point has two or more. [`node_types`]
//! derives it from child counts, but any classification can be supplied.
//!
//! # Branch order
//!
//! The branch order of a node is the number of branch points among its proper
//! ancestors. Two equivalent strategies are provided:
//!
//! - [`branch_order`]: a single top-down traversal from the root
//! - [`branch_order_sparse`]: repeated sparse matrix-vector products with the
//!   weighted child-to-parent operator
//!
//! # Example
//!
//! ```
//! use dendron::algo::topology::{branch_order, node_types};
//! use dendron::tree::{build_from_parents, Node, RegionCatalog};
//! use nalgebra::Point3;
//!
//! let mut catalog = RegionCatalog::new();
//! let r = catalog.get_or_insert("1");
//! let nodes = vec![Node::new(Point3::origin(), 1.0, r); 4];
//!
//! // 0 -> 1 -> {2, 3}
//! let tree = build_from_parents("y", nodes, &[None, Some(0), Some(1), Some(1)], catalog).unwrap();
//! let order = branch_order(&tree, &node_types(&tree)).unwrap();
//! assert_eq!(order, vec![0, 0, 1, 1]);
//! ```

use std::collections::VecDeque;

use nalgebra::DVector;

use super::sparse::CsrMatrix;
use crate::error::{MorphError, Result};
use crate::tree::{MorphologyTree, NodeId};

/// Structural role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// No children.
    Terminal,
    /// Exactly one child.
    Continuation,
    /// Two or more children.
    BranchPoint,
}

impl NodeType {
    /// Classify by number of children.
    pub fn from_child_count(count: usize) -> Self {
        match count {
            0 => NodeType::Terminal,
            1 => NodeType::Continuation,
            _ => NodeType::BranchPoint,
        }
    }

    /// Propagation weight: 2 for a branch point, 1 otherwise.
    #[inline]
    pub fn weight(self) -> f64 {
        match self {
            NodeType::BranchPoint => 2.0,
            NodeType::Terminal | NodeType::Continuation => 1.0,
        }
    }

    /// Whether this is a branch point.
    #[inline]
    pub fn is_branch_point(self) -> bool {
        self == NodeType::BranchPoint
    }
}

/// Classify every node of a tree by its child count.
pub fn node_types(tree: &MorphologyTree) -> Vec<NodeType> {
    tree.child_counts()
        .into_iter()
        .map(NodeType::from_child_count)
        .collect()
}

fn check_types(tree: &MorphologyTree, types: &[NodeType]) -> Result<()> {
    if types.len() != tree.num_nodes() {
        return Err(MorphError::invalid_param(
            "types",
            types.len(),
            "one classification per node required",
        ));
    }
    Ok(())
}

/// Compute the branch order of every node by a top-down traversal.
///
/// A node's order is its parent's order, plus one when the parent is
/// classified as a branch point. The root has order 0.
///
/// # Arguments
///
/// * `tree` - The input tree
/// * `types` - Classification of every node, indexed by node
pub fn branch_order(tree: &MorphologyTree, types: &[NodeType]) -> Result<Vec<u32>> {
    check_types(tree, types)?;

    let children = tree.children();
    let mut order = vec![0u32; tree.num_nodes()];
    let mut queue = VecDeque::from([tree.root()]);

    while let Some(v) = queue.pop_front() {
        let step = u32::from(types[v.index()].is_branch_point());
        for &c in &children[v.index()] {
            order[c.index()] = order[v.index()] + step;
            queue.push_back(c);
        }
    }

    Ok(order)
}

/// Compute the branch order of every node by sparse matrix propagation.
///
/// With `dA` the child-to-parent adjacency and `W = dA * diag(weight)`, the
/// vector `v_k = W^k * 1` holds, for each node, the product of the weights of
/// its first `k` ancestors while they exist and 0 once the walk passes the
/// root. Weights are at least 1, so the running maximum over `k` ends at the
/// full ancestor product `2^(branch point ancestors)`. The loop stops when
/// `v_k` vanishes, after at most tree-height products. The root is forced to
/// 1 and the order is `log2` of the result.
///
/// Results agree with [`branch_order`]. A path with 1024 or more branch
/// points overflows the `f64` accumulator and is reported as
/// [`MorphError::InvalidParameter`].
pub fn branch_order_sparse(tree: &MorphologyTree, types: &[NodeType]) -> Result<Vec<u32>> {
    check_types(tree, types)?;

    let n = tree.num_nodes();
    let weights: Vec<f64> = types.iter().map(|t| t.weight()).collect();
    let operator = tree.adjacency().scale_columns(&weights);

    // Contribution of each node's direct parent
    let mut residual = operator.mul_vec(&DVector::from_element(n, 1.0));
    let mut acc = residual.clone();

    // Paths are at most n - 1 edges long
    let mut steps = 0;
    while residual.iter().any(|&r| r != 0.0) {
        if steps == n {
            let node = residual.iter().position(|&r| r != 0.0).unwrap_or(0);
            return Err(MorphError::CyclicTopology { node });
        }
        steps += 1;
        residual = operator.mul_vec(&residual);
        for (a, &r) in acc.iter_mut().zip(residual.iter()) {
            if r > *a {
                *a = r;
            }
        }
    }

    acc[tree.root().index()] = 1.0;

    if let Some(node) = acc.iter().position(|v| !v.is_finite()) {
        return Err(MorphError::invalid_param(
            "types",
            format!("node {}", node),
            "1024 or more branch points on one path",
        ));
    }

    Ok(acc.iter().map(|&v| v.log2().round() as u32).collect())
}

/// Recover parent pointers from a child-to-parent adjacency matrix.
///
/// Rows without an entry map to `None`; a row with more than one entry is an
/// error since a node has at most one parent.
pub fn parents_from_adjacency(adjacency: &CsrMatrix) -> Result<Vec<Option<NodeId>>> {
    (0..adjacency.nrows())
        .map(|row| {
            let mut entries = adjacency.row(row).filter(|&(_, v)| v != 0.0);
            match (entries.next(), entries.next()) {
                (None, _) => Ok(None),
                (Some((col, _)), None) => Ok(Some(NodeId::new(col))),
                (Some(_), Some(_)) => Err(MorphError::invalid_param(
                    "adjacency",
                    format!("row {}", row),
                    "more than one parent",
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build_from_parents, Node, RegionCatalog};
    use nalgebra::Point3;

    fn tree_from(parents: &[Option<usize>]) -> MorphologyTree {
        let mut catalog = RegionCatalog::new();
        let r = catalog.get_or_insert("1");
        let nodes = (0..parents.len())
            .map(|i| Node::new(Point3::new(0.0, 0.0, i as f64), 1.0, r))
            .collect();
        build_from_parents("t", nodes, parents, catalog).unwrap()
    }

    /// A deterministic bushy tree.
    fn bushy(n: usize) -> MorphologyTree {
        let mut parents: Vec<Option<usize>> = vec![None];
        for i in 1..n {
            let parent = if i % 3 == 0 { i - 1 } else { i / 2 };
            parents.push(Some(parent));
        }
        tree_from(&parents)
    }

    #[test]
    fn test_unbranched_chain() {
        let tree = tree_from(&[None, Some(0), Some(1)]);
        let types = node_types(&tree);
        assert_eq!(branch_order(&tree, &types).unwrap(), vec![0, 0, 0]);
        assert_eq!(branch_order_sparse(&tree, &types).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_single_branch_point() {
        let tree = tree_from(&[None, Some(0), Some(1), Some(1)]);
        let types = node_types(&tree);
        assert_eq!(types[1], NodeType::BranchPoint);
        assert_eq!(branch_order(&tree, &types).unwrap(), vec![0, 0, 1, 1]);
        assert_eq!(branch_order_sparse(&tree, &types).unwrap(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_branching_root_counts() {
        // 0 -> {1, 2}, 1 -> {3, 4}, 3 -> 5
        let tree = tree_from(&[None, Some(0), Some(0), Some(1), Some(1), Some(3)]);
        let types = node_types(&tree);
        let expected = vec![0, 1, 1, 2, 2, 2];
        assert_eq!(branch_order(&tree, &types).unwrap(), expected);
        assert_eq!(branch_order_sparse(&tree, &types).unwrap(), expected);
    }

    #[test]
    fn test_single_node() {
        let tree = tree_from(&[None]);
        let types = node_types(&tree);
        assert_eq!(types, vec![NodeType::Terminal]);
        assert_eq!(branch_order_sparse(&tree, &types).unwrap(), vec![0]);
    }

    #[test]
    fn test_external_classification() {
        // Chain classified by caller: node 1 declared a branch point
        let tree = tree_from(&[None, Some(0), Some(1), Some(2)]);
        let types = vec![
            NodeType::Continuation,
            NodeType::BranchPoint,
            NodeType::Continuation,
            NodeType::Terminal,
        ];
        assert_eq!(branch_order(&tree, &types).unwrap(), vec![0, 0, 1, 1]);
        assert_eq!(branch_order_sparse(&tree, &types).unwrap(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_strategies_agree() {
        for n in [2, 17, 64, 257] {
            let tree = bushy(n);
            let types = node_types(&tree);
            assert_eq!(
                branch_order(&tree, &types).unwrap(),
                branch_order_sparse(&tree, &types).unwrap(),
                "n = {}",
                n
            );
        }
    }

    #[test]
    fn test_order_monotone_along_paths() {
        let tree = bushy(200);
        let types = node_types(&tree);
        let order = branch_order(&tree, &types).unwrap();

        assert_eq!(order[0], 0);
        for v in tree.node_ids().skip(1) {
            let p = tree.parent(v).unwrap();
            let step = u32::from(types[p.index()].is_branch_point());
            assert_eq!(order[v.index()], order[p.index()] + step);
        }
    }

    #[test]
    fn test_sparse_accumulator_overflow() {
        let n = 1100;
        let parents: Vec<Option<usize>> = (0..n).map(|i: usize| i.checked_sub(1)).collect();
        let tree = tree_from(&parents);
        let mut types = vec![NodeType::BranchPoint; n];
        types[n - 1] = NodeType::Terminal;

        let order = branch_order(&tree, &types).unwrap();
        assert_eq!(order[n - 1], (n - 1) as u32);
        assert!(matches!(
            branch_order_sparse(&tree, &types),
            Err(MorphError::InvalidParameter { name: "types", .. })
        ));

        // Short enough paths still agree
        let short = tree_from(&parents[..1000]);
        let types = vec![NodeType::BranchPoint; 1000];
        assert_eq!(
            branch_order_sparse(&short, &types).unwrap(),
            branch_order(&short, &types).unwrap()
        );
    }

    #[test]
    fn test_type_length_mismatch() {
        let tree = tree_from(&[None, Some(0)]);
        let result = branch_order(&tree, &[NodeType::Terminal]);
        assert!(matches!(result, Err(MorphError::InvalidParameter { name: "types", .. })));
        assert!(branch_order_sparse(&tree, &[]).is_err());
    }

    #[test]
    fn test_adjacency_round_trip() {
        let tree = bushy(50);
        let recovered = parents_from_adjacency(&tree.adjacency()).unwrap();
        assert_eq!(recovered, tree.parents());
    }

    #[test]
    fn test_adjacency_two_parents_rejected() {
        let a = CsrMatrix::from_triplets(3, 3, vec![(2, 0, 1.0), (2, 1, 1.0)]);
        assert!(parents_from_adjacency(&a).is_err());
    }
}
