//! The canonical morphology model.
//!
//! A [`MorphologyTree`] is one connected rooted tree of sample points. Files
//! holding several disjoint reconstructions produce a [`Morphology::Forest`].
//!
//! # Structure
//!
//! - Node 0 is the root and the only node without a parent
//! - Every other node stores exactly one parent
//! - Following parents from any node reaches the root
//! - Every node's region exists in the tree's own [`RegionCatalog`]
//!
//! These invariants are established once by [`build_from_parents`] and cannot
//! be broken afterwards: only node attributes and the name are mutable.
//!
//! [`build_from_parents`]: super::build_from_parents

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::builder::build_from_parents;
use super::index::{NodeId, RegionId};
use super::region::RegionCatalog;
use crate::algo::sparse::CsrMatrix;
use crate::error::{MorphError, Result};

/// Maximum nesting of forests (a forest of forests of trees).
pub const MAX_NESTING: usize = 2;

/// A sample point of a reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// The 3D position of this node.
    pub position: Point3<f64>,

    /// Diameter at this node.
    pub diameter: f64,

    /// Region index into the owning tree's catalog.
    pub region: RegionId,
}

impl Node {
    /// Create a new node.
    pub fn new(position: Point3<f64>, diameter: f64, region: RegionId) -> Self {
        Self {
            position,
            diameter,
            region,
        }
    }
}

/// One connected rooted tree.
///
/// Deserialized trees are rebuilt with [`build_from_parents`], so stored data
/// that breaks an invariant fails to load.
///
/// [`build_from_parents`]: super::build_from_parents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTree")]
pub struct MorphologyTree {
    pub(crate) name: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) parents: Vec<Option<NodeId>>,
    pub(crate) catalog: RegionCatalog,
}

impl MorphologyTree {
    /// Name of the tree.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the tree.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of nodes (always at least one).
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of parent edges, `num_nodes() - 1`.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.parents.iter().filter(|p| p.is_some()).count()
    }

    /// The root node.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Get a mutable node by ID.
    ///
    /// Only attributes are reachable this way; the topology stays fixed.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Parent of a node, `None` for the root.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.index()]
    }

    /// Parent vector indexed by node.
    pub fn parents(&self) -> &[Option<NodeId>] {
        &self.parents
    }

    /// Position of a node.
    #[inline]
    pub fn position(&self, id: NodeId) -> &Point3<f64> {
        &self.nodes[id.index()].position
    }

    /// Diameter of a node.
    #[inline]
    pub fn diameter(&self, id: NodeId) -> f64 {
        self.nodes[id.index()].diameter
    }

    /// Region index of a node.
    #[inline]
    pub fn region(&self, id: NodeId) -> RegionId {
        self.nodes[id.index()].region
    }

    /// Region name of a node.
    pub fn region_name(&self, id: NodeId) -> &str {
        &self.catalog[self.region(id)]
    }

    /// The tree's region catalog.
    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    /// Iterate over all node IDs.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Iterate over all nodes with their IDs.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i), n))
    }

    /// Number of children of every node.
    pub fn child_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.nodes.len()];
        for parent in self.parents.iter().flatten() {
            counts[parent.index()] += 1;
        }
        counts
    }

    /// Children of every node, in ascending node order.
    pub fn children(&self) -> Vec<Vec<NodeId>> {
        let mut children = vec![Vec::new(); self.nodes.len()];
        for (i, parent) in self.parents.iter().enumerate() {
            if let Some(p) = parent {
                children[p.index()].push(NodeId::new(i));
            }
        }
        children
    }

    /// Directed adjacency matrix `dA` with `dA[child][parent] = 1`.
    pub fn adjacency(&self) -> CsrMatrix {
        let n = self.nodes.len();
        let triplets = self
            .parents
            .iter()
            .enumerate()
            .filter_map(|(child, parent)| parent.map(|p| (child, p.index(), 1.0)))
            .collect();
        CsrMatrix::from_triplets(n, n, triplets)
    }

    /// Axis-aligned bounding box of all node positions.
    pub fn bounding_box(&self) -> (Point3<f64>, Point3<f64>) {
        let first = self.nodes[0].position;
        self.nodes
            .iter()
            .fold((first, first), |(min, max), node| {
                (min.inf(&node.position), max.sup(&node.position))
            })
    }
}

/// Serialized layout of a [`MorphologyTree`], before validation.
#[derive(Deserialize)]
struct RawTree {
    name: String,
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
    catalog: RegionCatalog,
}

impl TryFrom<RawTree> for MorphologyTree {
    type Error = MorphError;

    fn try_from(raw: RawTree) -> Result<Self> {
        let parents: Vec<Option<usize>> = raw.parents.iter().map(|p| p.map(NodeId::index)).collect();
        build_from_parents(raw.name, raw.nodes, &parents, raw.catalog)
    }
}

/// A single tree or an ordered collection of morphologies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Morphology {
    /// One connected tree.
    Tree(MorphologyTree),
    /// Independent trees (or forests) from one source.
    Forest(Vec<Morphology>),
}

impl Morphology {
    /// Nesting depth: 0 for a tree, 1 + deepest member for a forest.
    pub fn depth(&self) -> usize {
        match self {
            Morphology::Tree(_) => 0,
            Morphology::Forest(items) => 1 + items.iter().map(|m| m.depth()).max().unwrap_or(0),
        }
    }

    /// Fail with [`MorphError::NestingTooDeep`] if deeper than `max`.
    pub fn validate_depth(&self, max: usize) -> Result<()> {
        let depth = self.depth();
        if depth > max {
            return Err(MorphError::NestingTooDeep { depth, max });
        }
        Ok(())
    }

    /// Whether this is a forest.
    pub fn is_forest(&self) -> bool {
        matches!(self, Morphology::Forest(_))
    }

    /// The tree, if this is a single tree.
    pub fn as_tree(&self) -> Option<&MorphologyTree> {
        match self {
            Morphology::Tree(tree) => Some(tree),
            Morphology::Forest(_) => None,
        }
    }

    /// All trees in depth-first order.
    pub fn trees(&self) -> Vec<&MorphologyTree> {
        let mut out = Vec::new();
        self.collect_trees(&mut out);
        out
    }

    fn collect_trees<'a>(&'a self, out: &mut Vec<&'a MorphologyTree>) {
        match self {
            Morphology::Tree(tree) => out.push(tree),
            Morphology::Forest(items) => items.iter().for_each(|m| m.collect_trees(out)),
        }
    }

    /// Apply `f` to every tree in depth-first order.
    pub fn for_each_tree_mut<F: FnMut(&mut MorphologyTree)>(&mut self, f: &mut F) {
        match self {
            Morphology::Tree(tree) => f(tree),
            Morphology::Forest(items) => items.iter_mut().for_each(|m| m.for_each_tree_mut(f)),
        }
    }

    /// Consume into a flat list of trees in depth-first order.
    pub fn into_trees(self) -> Vec<MorphologyTree> {
        match self {
            Morphology::Tree(tree) => vec![tree],
            Morphology::Forest(items) => items.into_iter().flat_map(|m| m.into_trees()).collect(),
        }
    }

    /// Number of trees contained.
    pub fn num_trees(&self) -> usize {
        match self {
            Morphology::Tree(_) => 1,
            Morphology::Forest(items) => items.iter().map(|m| m.num_trees()).sum(),
        }
    }
}

impl From<MorphologyTree> for Morphology {
    fn from(tree: MorphologyTree) -> Self {
        Morphology::Tree(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(name: &str, n: usize) -> MorphologyTree {
        let mut catalog = RegionCatalog::new();
        let region = catalog.get_or_insert("1");
        let nodes = (0..n)
            .map(|i| Node::new(Point3::new(0.0, 0.0, i as f64), 1.0, region))
            .collect::<Vec<_>>();
        let parents = (0..n).map(|i| i.checked_sub(1)).collect::<Vec<_>>();
        build_from_parents(name, nodes, &parents, catalog).unwrap()
    }

    #[test]
    fn test_tree_accessors() {
        let tree = chain("c", 3);
        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.num_edges(), 2);
        assert_eq!(tree.parent(NodeId::new(0)), None);
        assert_eq!(tree.parent(NodeId::new(2)), Some(NodeId::new(1)));
        assert_eq!(tree.child_counts(), vec![1, 1, 0]);
        assert_eq!(tree.region_name(NodeId::new(1)), "1");

        let (min, max) = tree.bounding_box();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_adjacency() {
        let tree = chain("c", 4);
        let da = tree.adjacency();
        assert_eq!(da.nrows(), 4);
        assert_eq!(da.nnz(), 3);
        assert_eq!(da.get(2, 1), 1.0);
        assert_eq!(da.get(1, 2), 0.0);
    }

    #[test]
    fn test_depth_and_flatten() {
        let single = Morphology::from(chain("a", 2));
        assert_eq!(single.depth(), 0);

        let forest = Morphology::Forest(vec![
            Morphology::from(chain("a", 2)),
            Morphology::Forest(vec![Morphology::from(chain("b", 3))]),
        ]);
        assert_eq!(forest.depth(), 2);
        assert_eq!(forest.num_trees(), 2);
        assert!(forest.validate_depth(MAX_NESTING).is_ok());

        let names: Vec<_> = forest.trees().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let too_deep = Morphology::Forest(vec![forest]);
        assert!(matches!(
            too_deep.validate_depth(MAX_NESTING),
            Err(MorphError::NestingTooDeep { depth: 3, max: 2 })
        ));
    }

    #[test]
    fn test_for_each_tree_mut() {
        let mut forest = Morphology::Forest(vec![
            Morphology::from(chain("a", 2)),
            Morphology::from(chain("b", 2)),
        ]);
        forest.for_each_tree_mut(&mut |t: &mut MorphologyTree| {
            t.node_mut(NodeId::ROOT).diameter = 5.0;
        });
        for tree in forest.into_trees() {
            assert_eq!(tree.diameter(NodeId::ROOT), 5.0);
        }
    }

    #[test]
    fn test_deserialize_revalidates() {
        let tree = chain("c", 3);
        let json = serde_json::to_value(&tree).unwrap();
        let back: MorphologyTree = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, tree);

        let mut cyclic = json.clone();
        cyclic["parents"] = serde_json::json!([null, 2, 1]);
        assert!(serde_json::from_value::<MorphologyTree>(cyclic).is_err());

        let mut stray_region = json;
        stray_region["nodes"][0]["region"] = serde_json::json!(5);
        assert!(serde_json::from_value::<MorphologyTree>(stray_region).is_err());
    }

    #[test]
    fn test_empty_forest_depth() {
        assert_eq!(Morphology::Forest(Vec::new()).depth(), 1);
        assert_eq!(Morphology::Forest(Vec::new()).num_trees(), 0);
    }
}
